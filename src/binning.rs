//! Fixed-width and gene-width aggregation of insertions for genome map tracks

use crate::{chromosome::ChromosomeMap, join::AnnotationJoiner, AnnotatedInsertion, HitRecord};
use serde::Serialize;

pub const INTERGENIC: &str = "intergenic";

/// Insertions and reads over the inclusive range `bin_start..=bin_end`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinAggregate {
    pub chromosome: String,
    pub bin_start: u64,
    pub bin_end: u64,
    pub label: Option<String>,
    pub insertion_count: u64,
    pub total_reads: u64,
}

impl BinAggregate {
    fn empty(chromosome: &str, bin_start: u64, bin_end: u64, label: Option<String>) -> Self {
        Self {
            chromosome: chromosome.to_string(),
            bin_start,
            bin_end,
            label,
            insertion_count: 0,
            total_reads: 0,
        }
    }
}

/// Genes with hits and their strain and read totals on one chromosome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitSummary {
    pub chromosome: String,
    pub genes_hit: usize,
    pub strains: u64,
    pub reads: u64,
}

/// Add every insertion of `chromosome` to the bin whose range contains it.
/// `bins` must be sorted and non-overlapping.
fn accumulate(bins: &mut [BinAggregate], chromosome: &str, insertions: &[AnnotatedInsertion]) {
    for insertion in insertions.iter().filter(|i| i.chromosome == chromosome) {
        let position = insertion.position as u64;
        let idx = bins.partition_point(|bin| bin.bin_start <= position);
        if idx == 0 {
            continue;
        }
        let bin = &mut bins[idx - 1];
        if position <= bin.bin_end {
            bin.insertion_count += 1;
            bin.total_reads += insertion.total_reads;
        }
    }
}

/// Consecutive bins of `bin_width` bases covering `0..=genome_length`; the
/// last bin may be shorter
pub fn fixed_width_bins(
    chromosome: &str,
    genome_length: u32,
    bin_width: u32,
    insertions: &[AnnotatedInsertion],
) -> Vec<BinAggregate> {
    let genome_length = genome_length as u64;
    let bin_width = bin_width.max(1) as u64;

    let mut bins: Vec<BinAggregate> = (0..=genome_length)
        .step_by(bin_width as usize)
        .map(|start| {
            let end = (start + bin_width - 1).min(genome_length);
            BinAggregate::empty(chromosome, start, end, None)
        })
        .collect();

    accumulate(&mut bins, chromosome, insertions);
    bins
}

/// One bin per resolved gene interval and one per intergenic stretch between
/// them, labelled with the gene description or [`INTERGENIC`]
pub fn gene_width_bins(
    chromosome: &str,
    genome_length: u32,
    joiner: &AnnotationJoiner,
    insertions: &[AnnotatedInsertion],
) -> Vec<BinAggregate> {
    let genome_length = genome_length as u64;
    let mut bins = Vec::new();
    let mut cursor = 0u64;

    for interval in joiner.intervals(chromosome) {
        if interval.start > genome_length {
            break;
        }
        if interval.start > cursor {
            bins.push(BinAggregate::empty(
                chromosome,
                cursor,
                interval.start - 1,
                Some(INTERGENIC.to_string()),
            ));
        }
        let end = interval.end.min(genome_length);
        bins.push(BinAggregate::empty(
            chromosome,
            interval.start,
            end,
            Some(joiner.gene(interval).description.clone()),
        ));
        cursor = end + 1;
    }

    if cursor <= genome_length {
        bins.push(BinAggregate::empty(
            chromosome,
            cursor,
            genome_length,
            Some(INTERGENIC.to_string()),
        ));
    }

    accumulate(&mut bins, chromosome, insertions);
    bins
}

/// Per-chromosome totals of the hit table, in chromosome map order.
/// Hits must already carry canonical chromosome names.
pub fn summarize_hits(hits: &[HitRecord], chromosome_map: &ChromosomeMap) -> Vec<HitSummary> {
    chromosome_map
        .entries()
        .iter()
        .map(|entry| {
            let on_chromosome = hits.iter().filter(|h| h.chromosome == entry.name);
            let mut summary = HitSummary {
                chromosome: entry.name.clone(),
                genes_hit: 0,
                strains: 0,
                reads: 0,
            };
            for hit in on_chromosome {
                summary.genes_hit += 1;
                summary.strains += hit.n_strains;
                summary.reads += hit.n_reads;
            }
            summary
        })
        .collect()
}
