//! Parallel (chromosome x library size x sampling mode) simulation sweep

use crate::{
    chromosome::ChromosomeMap,
    density::{DensityProfile, GeneScaleDensity, PositionSeries},
    ecdf::zero_density_probability,
    simulate::{BiasedWeights, Simulator, UniformWeights},
    utils::log_progress,
    AnalysisConfig, AnnotatedInsertion, EssentialityStat, SamplingMode, TnseqError, TnseqResult,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Observed counts and density profile of one chromosome, shared read-only
/// by every simulation on it
#[derive(Debug, Clone)]
pub struct ChromosomeData {
    pub name: String,
    pub genome_length: u32,
    pub series: PositionSeries,
    pub profile: DensityProfile,
}

/// Build position series and density profiles in chromosome map order
pub fn prepare_chromosomes(
    annotated: &[AnnotatedInsertion],
    chromosome_map: &ChromosomeMap,
    config: &AnalysisConfig,
) -> TnseqResult<Vec<ChromosomeData>> {
    chromosome_map
        .entries()
        .iter()
        .map(|entry| {
            let series = PositionSeries::from_insertions(&entry.name, entry.length, annotated)?;
            let profile = DensityProfile::from_series(&series, config.fine_window);
            log::info!(
                "{}: {} insertions at {} distinct positions over {} bp",
                entry.name,
                series.total(),
                series.occupied(),
                series.len()
            );
            Ok(ChromosomeData {
                name: entry.name.clone(),
                genome_length: entry.length,
                series,
                profile,
            })
        })
        .collect()
}

/// Zero-density probability of the observed library itself
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedStat {
    pub chromosome: String,
    pub insertions: u64,
    pub zero_density_probability: f64,
}

/// Observed baseline per chromosome. Chromosomes too short for one
/// gene-scale window are skipped with a warning.
pub fn observed_stats(chromosomes: &[ChromosomeData], config: &AnalysisConfig) -> Vec<ObservedStat> {
    chromosomes
        .iter()
        .filter_map(|chrom| {
            let density =
                GeneScaleDensity::from_series(&chrom.series, config.coarse_window, config.coarse_stride);
            match zero_density_probability(&density) {
                Ok(probability) => Some(ObservedStat {
                    chromosome: chrom.name.clone(),
                    insertions: chrom.series.total(),
                    zero_density_probability: probability,
                }),
                Err(e) => {
                    log::warn!("No observed baseline for {}: {}", chrom.name, e);
                    None
                }
            }
        })
        .collect()
}

/// A simulation that did not produce a statistic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationFailure {
    pub chromosome: String,
    pub library_size: usize,
    pub sampling_mode: SamplingMode,
    pub reason: String,
}

/// Fine density profile of one simulated library, kept at every `step`-th
/// position: `values[j]` is the density at position `j * step`
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedProfile {
    pub chromosome: String,
    pub library_size: usize,
    pub sampling_mode: SamplingMode,
    pub step: usize,
    pub values: Vec<f64>,
}

impl SimulatedProfile {
    pub fn from_profile(
        library_size: usize,
        sampling_mode: SamplingMode,
        profile: &DensityProfile,
        step: usize,
    ) -> Self {
        let step = step.max(1);
        Self {
            chromosome: profile.chromosome.clone(),
            library_size,
            sampling_mode,
            step,
            values: profile.values().iter().copied().step_by(step).collect(),
        }
    }

    /// (position, density) pairs
    pub fn points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(j, &density)| (j * self.step, density))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub stats: Vec<EssentialityStat>,
    pub failures: Vec<SimulationFailure>,
    pub profiles: Vec<SimulatedProfile>,
}

#[derive(Debug, Clone, Copy)]
struct SweepTask {
    chromosome: usize,
    library_size: usize,
    mode: SamplingMode,
}

type TaskOutcome = Result<(EssentialityStat, Option<SimulatedProfile>), SimulationFailure>;

/// Tasks in output order: chromosome, then library size, then mode
fn plan_tasks(chromosomes: usize, config: &AnalysisConfig) -> Vec<SweepTask> {
    let mut sizes = config.library_sizes.clone();
    sizes.sort_unstable();
    sizes.dedup();

    let mut tasks = Vec::with_capacity(chromosomes * sizes.len() * SamplingMode::ALL.len());
    for chromosome in 0..chromosomes {
        for &library_size in &sizes {
            for mode in SamplingMode::ALL {
                tasks.push(SweepTask {
                    chromosome,
                    library_size,
                    mode,
                });
            }
        }
    }
    tasks
}

fn task_rng(seed: Option<u64>, task_index: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(task_index as u64)),
        None => StdRng::from_entropy(),
    }
}

/// Build one simulator per (chromosome, mode). A failed build is kept as its
/// message so every task that needs it can report it.
fn build_simulators(chromosomes: &[ChromosomeData]) -> Vec<[Result<Simulator, String>; 2]> {
    chromosomes
        .iter()
        .map(|chrom| {
            let biased = Simulator::new(
                &chrom.name,
                chrom.genome_length,
                &BiasedWeights::new(&chrom.profile),
            );
            let uniform = Simulator::new(&chrom.name, chrom.genome_length, &UniformWeights);
            [
                biased.map_err(|e| e.to_string()),
                uniform.map_err(|e| e.to_string()),
            ]
        })
        .collect()
}

fn mode_slot(mode: SamplingMode) -> usize {
    match mode {
        SamplingMode::Biased => 0,
        SamplingMode::Uniform => 1,
    }
}

/// Simulate every (chromosome, library size, mode) combination on a rayon
/// pool. Failures stay isolated to their task; the report lists statistics
/// in a stable order regardless of completion order.
pub fn run_sweep(chromosomes: &[ChromosomeData], config: &AnalysisConfig) -> TnseqResult<SweepReport> {
    config.validate()?;

    let tasks = plan_tasks(chromosomes.len(), config);
    if tasks.is_empty() {
        return Ok(SweepReport::default());
    }

    let simulators = build_simulators(chromosomes);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build()
        .map_err(|e| TnseqError::InvalidConfig(format!("cannot build thread pool: {}", e)))?;

    log::info!(
        "Running {} simulations on {} threads",
        tasks.len(),
        config.num_threads
    );

    let completed = AtomicUsize::new(0);
    let outcomes: Vec<TaskOutcome> = pool.install(|| {
        tasks
            .par_iter()
            .enumerate()
            .map(|(task_index, task)| {
                let chrom = &chromosomes[task.chromosome];
                let outcome = run_task(chrom, &simulators[task.chromosome], task, task_index, config);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                log_progress(done, tasks.len(), "Simulations");
                outcome
            })
            .collect()
    });

    let mut report = SweepReport::default();
    for outcome in outcomes {
        match outcome {
            Ok((stat, profile)) => {
                report.stats.push(stat);
                report.profiles.extend(profile);
            }
            Err(failure) => {
                log::warn!(
                    "Simulation {} / {} / {} failed: {}",
                    failure.chromosome,
                    failure.library_size,
                    failure.sampling_mode,
                    failure.reason
                );
                report.failures.push(failure);
            }
        }
    }

    Ok(report)
}

fn run_task(
    chrom: &ChromosomeData,
    simulators: &[Result<Simulator, String>; 2],
    task: &SweepTask,
    task_index: usize,
    config: &AnalysisConfig,
) -> TaskOutcome {
    let failure = |reason: String| SimulationFailure {
        chromosome: chrom.name.clone(),
        library_size: task.library_size,
        sampling_mode: task.mode,
        reason,
    };

    let simulator = simulators[mode_slot(task.mode)]
        .as_ref()
        .map_err(|reason| failure(reason.clone()))?;

    let mut rng = task_rng(config.seed, task_index);
    let library = simulator.simulate(task.library_size, &mut rng);

    let density = library.gene_scale_density(config.coarse_window, config.coarse_stride);
    let probability = zero_density_probability(&density).map_err(|e| failure(e.to_string()))?;

    let profile = config.retain_profiles.then(|| {
        SimulatedProfile::from_profile(
            task.library_size,
            task.mode,
            &library.fine_profile(config.fine_window),
            config.profile_step,
        )
    });

    Ok((
        EssentialityStat {
            chromosome: chrom.name.clone(),
            library_size: task.library_size,
            sampling_mode: task.mode,
            zero_density_probability: probability,
        },
        profile,
    ))
}
