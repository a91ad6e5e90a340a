//! End-to-end analysis from loaded tables to in-memory result tables

use crate::{
    binning::{fixed_width_bins, gene_width_bins, summarize_hits, BinAggregate, HitSummary},
    chromosome::ChromosomeMap,
    join::annotate_insertions,
    sweep::{observed_stats, prepare_chromosomes, run_sweep, ObservedStat, SweepReport},
    tables::{DroppedRows, InputTables},
    utils::Timer,
    AnalysisConfig, AnnotatedInsertion, TnseqError, TnseqResult,
};

/// Aggregates for the genome map tracks
#[derive(Debug, Clone, Default)]
pub struct Tracks {
    pub annotated: Vec<AnnotatedInsertion>,
    pub fixed_bins: Vec<BinAggregate>,
    pub gene_bins: Vec<BinAggregate>,
    pub hit_summary: Vec<HitSummary>,
    pub dropped: DroppedRows,
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    pub tracks: Tracks,
    pub observed: Vec<ObservedStat>,
    pub sweep: SweepReport,
}

fn check_positions(annotated: &[AnnotatedInsertion], chromosome_map: &ChromosomeMap) -> TnseqResult<()> {
    for insertion in annotated {
        let length = chromosome_map.length_of(&insertion.chromosome).ok_or_else(|| {
            TnseqError::UnmappedChromosome(insertion.chromosome.clone())
        })?;
        if insertion.position > length {
            return Err(TnseqError::MalformedInputTable(format!(
                "insertion at {}:{} lies beyond the chromosome length {}",
                insertion.chromosome, insertion.position, length
            )));
        }
    }
    Ok(())
}

/// Join insertions to genes and aggregate them into bins per chromosome.
/// `tables` must already carry canonical chromosome names.
pub fn build_tracks(
    tables: InputTables,
    chromosome_map: &ChromosomeMap,
    config: &AnalysisConfig,
) -> TnseqResult<Tracks> {
    let _timer = Timer::new("Joining insertions to genes");
    let (joiner, annotated) = annotate_insertions(&tables.insertions, tables.genes, chromosome_map)?;
    check_positions(&annotated, chromosome_map)?;

    let hit_summary = summarize_hits(&tables.hits, chromosome_map);

    let mut fixed_bins = Vec::new();
    let mut gene_bins = Vec::new();
    for entry in chromosome_map.entries() {
        fixed_bins.extend(fixed_width_bins(
            &entry.name,
            entry.length,
            config.bin_width,
            &annotated,
        ));
        gene_bins.extend(gene_width_bins(&entry.name, entry.length, &joiner, &annotated));
    }

    log::info!(
        "Built {} fixed-width and {} gene-width bins",
        fixed_bins.len(),
        gene_bins.len()
    );

    Ok(Tracks {
        annotated,
        fixed_bins,
        gene_bins,
        hit_summary,
        dropped: tables.dropped,
    })
}

/// Tracks, observed baseline and the full simulation sweep
pub fn run_analysis(
    tables: InputTables,
    chromosome_map: &ChromosomeMap,
    config: &AnalysisConfig,
) -> TnseqResult<AnalysisReport> {
    config.validate()?;

    let tracks = build_tracks(tables, chromosome_map, config)?;

    let chromosomes = {
        let _timer = Timer::new("Building density profiles");
        prepare_chromosomes(&tracks.annotated, chromosome_map, config)?
    };
    let observed = observed_stats(&chromosomes, config);

    let sweep = {
        let _timer = Timer::new("Simulating libraries");
        run_sweep(&chromosomes, config)?
    };

    Ok(AnalysisReport {
        tracks,
        observed,
        sweep,
    })
}
