//! Interval join of insertion positions against gene coordinates

use crate::{
    chromosome::ChromosomeMap, AnnotatedInsertion, GeneAnnotation, InsertionRecord, TnseqError,
    TnseqResult,
};
use std::collections::HashMap;

/// A gene interval after overlap resolution. Intervals of one chromosome are
/// disjoint and strictly increasing; `gene` indexes into the joiner's genes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedInterval {
    pub start: u64,
    pub end: u64,
    pub gene: usize,
}

impl ResolvedInterval {
    pub fn contains(&self, position: u64) -> bool {
        self.start <= position && position <= self.end
    }
}

/// Turn genes sorted by start into disjoint intervals.
///
/// The interleaved breakpoint sequence `start1, end1, start2, end2, ...` is
/// walked once; any breakpoint at or before its predecessor is moved to
/// predecessor + 1. Where genes overlap, the earlier gene keeps the shared
/// positions.
pub fn resolve_breakpoints(sorted: &[(usize, &GeneAnnotation)]) -> Vec<ResolvedInterval> {
    let mut intervals = Vec::with_capacity(sorted.len());
    let mut previous: Option<u64> = None;

    let mut bump = |value: u64| -> u64 {
        let value = match previous {
            Some(prev) if value <= prev => prev + 1,
            _ => value,
        };
        previous = Some(value);
        value
    };

    for &(gene, annotation) in sorted {
        let start = bump(annotation.start() as u64);
        let end = bump(annotation.stop() as u64);
        intervals.push(ResolvedInterval { start, end, gene });
    }

    intervals
}

/// Per-chromosome sorted interval index over a gene annotation
#[derive(Debug, Clone, Default)]
pub struct AnnotationJoiner {
    genes: Vec<GeneAnnotation>,
    intervals: HashMap<String, Vec<ResolvedInterval>>,
}

impl AnnotationJoiner {
    /// Build the index. Chromosome names must already be canonical.
    pub fn new(genes: Vec<GeneAnnotation>) -> Self {
        let mut by_chromosome: HashMap<&str, Vec<(usize, &GeneAnnotation)>> = HashMap::new();
        for (idx, gene) in genes.iter().enumerate() {
            by_chromosome
                .entry(gene.chromosome.as_str())
                .or_default()
                .push((idx, gene));
        }

        let mut intervals = HashMap::with_capacity(by_chromosome.len());
        for (chromosome, mut chrom_genes) in by_chromosome {
            // stable: equal starts keep declaration order
            chrom_genes.sort_by_key(|(_, gene)| gene.start());
            intervals.insert(chromosome.to_string(), resolve_breakpoints(&chrom_genes));
        }

        log::debug!(
            "Indexed {} genes on {} chromosomes",
            genes.len(),
            intervals.len()
        );

        Self { genes, intervals }
    }

    pub fn genes(&self) -> &[GeneAnnotation] {
        &self.genes
    }

    pub fn gene(&self, interval: &ResolvedInterval) -> &GeneAnnotation {
        &self.genes[interval.gene]
    }

    /// Resolved intervals of one chromosome in genome order
    pub fn intervals(&self, chromosome: &str) -> &[ResolvedInterval] {
        self.intervals
            .get(chromosome)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Find the resolved interval containing `position`, if any
    pub fn locate_interval(&self, chromosome: &str, position: u32) -> Option<&ResolvedInterval> {
        let intervals = self.intervals(chromosome);
        let position = position as u64;
        let idx = intervals.partition_point(|iv| iv.start <= position);
        if idx == 0 {
            return None;
        }

        let candidate = &intervals[idx - 1];
        candidate.contains(position).then_some(candidate)
    }

    /// Find the gene containing `position`, if any
    pub fn locate(&self, chromosome: &str, position: u32) -> Option<&GeneAnnotation> {
        self.locate_interval(chromosome, position)
            .map(|interval| self.gene(interval))
    }

    pub fn annotate(&self, insertions: &[InsertionRecord]) -> Vec<AnnotatedInsertion> {
        insertions
            .iter()
            .map(|record| {
                let interval = self.locate_interval(&record.chromosome, record.position);
                AnnotatedInsertion {
                    chromosome: record.chromosome.clone(),
                    position: record.position,
                    total_reads: record.total_reads,
                    gene_begin: interval.map(|iv| iv.start),
                    gene_end: interval.map(|iv| iv.end),
                    description: interval.map(|iv| self.gene(iv).description.clone()),
                }
            })
            .collect()
    }
}

/// Join insertions with canonical chromosome names against the genes.
///
/// Every insertion must lie on a chromosome of the map.
pub fn annotate_insertions(
    insertions: &[InsertionRecord],
    genes: Vec<GeneAnnotation>,
    chromosome_map: &ChromosomeMap,
) -> TnseqResult<(AnnotationJoiner, Vec<AnnotatedInsertion>)> {
    if let Some(record) = insertions
        .iter()
        .find(|r| chromosome_map.length_of(&r.chromosome).is_none())
    {
        return Err(TnseqError::UnmappedChromosome(record.chromosome.clone()));
    }

    let joiner = AnnotationJoiner::new(genes);
    let annotated = joiner.annotate(insertions);

    let genic = annotated.iter().filter(|a| a.is_genic()).count();
    log::info!(
        "Annotated {} of {} insertions with a gene",
        genic,
        annotated.len()
    );

    Ok((joiner, annotated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chromosome::ChromosomeEntry, Strand, TnseqError};

    fn gene(chromosome: &str, locus: &str, begin: u32, end: u32) -> GeneAnnotation {
        GeneAnnotation {
            chromosome: chromosome.to_string(),
            locus_id: locus.to_string(),
            begin,
            end,
            strand: Strand::Forward,
            description: format!("{} product", locus),
            gc_content: 0.5,
        }
    }

    #[test]
    fn test_locate_inside_and_outside() {
        let joiner = AnnotationJoiner::new(vec![
            gene("Ch1", "g1", 100, 300),
            gene("Ch1", "g2", 500, 700),
        ]);

        assert_eq!(joiner.locate("Ch1", 100).unwrap().locus_id, "g1");
        assert_eq!(joiner.locate("Ch1", 300).unwrap().locus_id, "g1");
        assert_eq!(joiner.locate("Ch1", 600).unwrap().locus_id, "g2");
        assert!(joiner.locate("Ch1", 99).is_none());
        assert!(joiner.locate("Ch1", 301).is_none());
        assert!(joiner.locate("Ch1", 900).is_none());
        assert!(joiner.locate("Ch2", 150).is_none());
    }

    #[test]
    fn test_reverse_coordinates() {
        let joiner = AnnotationJoiner::new(vec![gene("Ch1", "g1", 300, 100)]);
        assert_eq!(joiner.locate("Ch1", 200).unwrap().locus_id, "g1");
    }

    #[test]
    fn test_overlap_goes_to_earlier_gene() {
        // declared out of order on purpose
        let joiner = AnnotationJoiner::new(vec![
            gene("Ch1", "g2", 150, 250),
            gene("Ch1", "g1", 100, 200),
        ]);

        assert_eq!(joiner.locate("Ch1", 160).unwrap().locus_id, "g1");
        assert_eq!(joiner.locate("Ch1", 200).unwrap().locus_id, "g1");
        assert_eq!(joiner.locate("Ch1", 201).unwrap().locus_id, "g2");
        assert_eq!(joiner.locate("Ch1", 250).unwrap().locus_id, "g2");
    }

    #[test]
    fn test_resolve_breakpoints() {
        let genes = [
            gene("Ch1", "g1", 100, 300),
            gene("Ch1", "g2", 150, 200),
            gene("Ch1", "g3", 300, 400),
            gene("Ch1", "g4", 1000, 1000),
        ];
        let sorted: Vec<(usize, &GeneAnnotation)> = genes.iter().enumerate().collect();
        let intervals = resolve_breakpoints(&sorted);

        let bounds: Vec<(u64, u64)> = intervals.iter().map(|iv| (iv.start, iv.end)).collect();
        assert_eq!(
            bounds,
            vec![(100, 300), (301, 302), (303, 400), (1000, 1001)]
        );

        // strictly increasing after resolution
        for pair in intervals.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }
    }

    #[test]
    fn test_adjacent_genes_share_boundary() {
        let joiner = AnnotationJoiner::new(vec![
            gene("Ch1", "g1", 100, 200),
            gene("Ch1", "g2", 200, 300),
        ]);

        assert_eq!(joiner.locate("Ch1", 200).unwrap().locus_id, "g1");
        assert_eq!(joiner.locate("Ch1", 201).unwrap().locus_id, "g2");
    }

    #[test]
    fn test_annotate_reports_resolved_bounds() {
        let joiner = AnnotationJoiner::new(vec![
            gene("Ch1", "g1", 100, 200),
            gene("Ch1", "g2", 150, 250),
        ]);
        let annotated = joiner.annotate(&[
            InsertionRecord::new("Ch1".to_string(), 220, 4),
            InsertionRecord::new("Ch1".to_string(), 400, 1),
        ]);

        assert_eq!(annotated[0].gene_begin, Some(201));
        assert_eq!(annotated[0].gene_end, Some(250));
        assert_eq!(annotated[0].description.as_deref(), Some("g2 product"));
        assert!(!annotated[1].is_genic());
        assert_eq!(annotated[1].gene_begin, None);
    }

    #[test]
    fn test_annotated_bounds_contain_position() {
        // g2 lies inside g1 and is pushed past its end
        let joiner = AnnotationJoiner::new(vec![
            gene("Ch1", "g1", 100, 300),
            gene("Ch1", "g2", 150, 200),
        ]);
        let annotated = joiner.annotate(&[
            InsertionRecord::new("Ch1".to_string(), 160, 1),
            InsertionRecord::new("Ch1".to_string(), 301, 1),
        ]);

        assert_eq!(annotated[0].description.as_deref(), Some("g1 product"));
        assert_eq!(annotated[1].description.as_deref(), Some("g2 product"));
        assert_eq!(annotated[1].gene_begin, Some(301));
        assert_eq!(annotated[1].gene_end, Some(302));
        for row in &annotated {
            let (begin, end) = (row.gene_begin.unwrap(), row.gene_end.unwrap());
            assert!(begin <= row.position as u64 && row.position as u64 <= end);
        }
    }

    #[test]
    fn test_annotate_insertions() {
        let map = ChromosomeMap::new(vec![ChromosomeEntry {
            raw_id: "NC_1".to_string(),
            name: "Ch1".to_string(),
            length: 1000,
        }])
        .unwrap();

        let insertions = vec![
            InsertionRecord::new("Ch1".to_string(), 150, 5),
            InsertionRecord::new("Ch1".to_string(), 900, 1),
        ];
        let genes = vec![gene("Ch1", "g1", 100, 300)];

        let (joiner, annotated) = annotate_insertions(&insertions, genes.clone(), &map).unwrap();
        assert_eq!(annotated.len(), 2);
        assert!(annotated[0].is_genic());
        assert!(!annotated[1].is_genic());
        assert_eq!(joiner.intervals("Ch1").len(), 1);

        let raw = vec![InsertionRecord::new("NC_9".to_string(), 150, 5)];
        match annotate_insertions(&raw, genes, &map) {
            Err(TnseqError::UnmappedChromosome(id)) => assert_eq!(id, "NC_9"),
            other => panic!("Expected UnmappedChromosome, got {:?}", other),
        }
    }
}
