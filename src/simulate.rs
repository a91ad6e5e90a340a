//! Resampling of insertion libraries under a positional weight model

use crate::{
    density::{DensityProfile, GeneScaleDensity, PositionSeries},
    SamplingMode, TnseqError, TnseqResult,
};
use rand::distributions::{Distribution, Uniform, WeightedIndex};
use rand::Rng;

/// Draws positions in `0..len`
#[derive(Debug, Clone)]
pub enum PositionSampler {
    Weighted(WeightedIndex<f64>),
    Uniform(Uniform<usize>),
}

impl Distribution<usize> for PositionSampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match self {
            PositionSampler::Weighted(dist) => dist.sample(rng),
            PositionSampler::Uniform(dist) => dist.sample(rng),
        }
    }
}

/// Relative probability of drawing each position
pub trait SamplingWeights {
    fn mode(&self) -> SamplingMode;

    fn weight(&self, position: usize) -> f64;

    /// Build a sampler over `0..len` from [`SamplingWeights::weight`]. Fails
    /// when no position has positive weight.
    fn sampler(&self, chromosome: &str, len: usize) -> TnseqResult<PositionSampler> {
        let weights: Vec<f64> = (0..len).map(|pos| self.weight(pos)).collect();
        if weights.iter().all(|&w| w <= 0.0) {
            return Err(TnseqError::DegenerateSamplingWeights(format!(
                "every position of {} has zero weight",
                chromosome
            )));
        }
        WeightedIndex::new(weights)
            .map(PositionSampler::Weighted)
            .map_err(|e| TnseqError::DegenerateSamplingWeights(format!("{}: {}", chromosome, e)))
    }
}

/// Weights taken from the observed density profile; positions of zero
/// density are never drawn
#[derive(Debug, Clone, Copy)]
pub struct BiasedWeights<'a> {
    profile: &'a DensityProfile,
}

impl<'a> BiasedWeights<'a> {
    pub fn new(profile: &'a DensityProfile) -> Self {
        Self { profile }
    }
}

impl SamplingWeights for BiasedWeights<'_> {
    fn mode(&self) -> SamplingMode {
        SamplingMode::Biased
    }

    fn weight(&self, position: usize) -> f64 {
        self.profile.values().get(position).copied().unwrap_or(0.0)
    }
}

/// Every position equally likely
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformWeights;

impl SamplingWeights for UniformWeights {
    fn mode(&self) -> SamplingMode {
        SamplingMode::Uniform
    }

    fn weight(&self, _position: usize) -> f64 {
        1.0
    }

    fn sampler(&self, chromosome: &str, len: usize) -> TnseqResult<PositionSampler> {
        if len == 0 {
            return Err(TnseqError::DegenerateSamplingWeights(format!(
                "{} has no positions to draw from",
                chromosome
            )));
        }
        Ok(PositionSampler::Uniform(Uniform::new(0, len)))
    }
}

/// A simulated insertion library
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedLibrary {
    pub library_size: usize,
    pub mode: SamplingMode,
    pub samples: PositionSeries,
}

impl SimulatedLibrary {
    /// Fine rolling mean, comparable to the observed density profile
    pub fn fine_profile(&self, width: usize) -> DensityProfile {
        DensityProfile::from_series(&self.samples, width)
    }

    pub fn gene_scale_density(&self, width: usize, stride: usize) -> GeneScaleDensity {
        GeneScaleDensity::from_series(&self.samples, width, stride)
    }
}

/// Draws simulated libraries for one chromosome and one sampling mode. The
/// sampler is built once and shared by every library size.
#[derive(Debug, Clone)]
pub struct Simulator {
    chromosome: String,
    genome_length: u32,
    mode: SamplingMode,
    sampler: PositionSampler,
}

impl Simulator {
    pub fn new<W: SamplingWeights + ?Sized>(
        chromosome: &str,
        genome_length: u32,
        weights: &W,
    ) -> TnseqResult<Self> {
        let sampler = weights.sampler(chromosome, genome_length as usize + 1)?;
        Ok(Self {
            chromosome: chromosome.to_string(),
            genome_length,
            mode: weights.mode(),
            sampler,
        })
    }

    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    /// Draw `library_size` positions with replacement
    pub fn simulate<R: Rng + ?Sized>(&self, library_size: usize, rng: &mut R) -> SimulatedLibrary {
        let mut samples = PositionSeries::zeros(&self.chromosome, self.genome_length);
        for _ in 0..library_size {
            let position = self.sampler.sample(rng);
            samples.increment(position);
        }

        log::debug!(
            "Simulated {} library of {} insertions on {} ({} positions hit)",
            self.mode,
            library_size,
            self.chromosome,
            samples.occupied()
        );

        SimulatedLibrary {
            library_size,
            mode: self.mode,
            samples,
        }
    }
}
