//! Dense per-base insertion counts and rolling-window density profiles

use crate::{AnnotatedInsertion, TnseqError, TnseqResult};

/// Per-base insertion counts over `0..=genome_length` of one chromosome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSeries {
    pub chromosome: String,
    counts: Vec<u32>,
}

impl PositionSeries {
    pub fn zeros(chromosome: &str, genome_length: u32) -> Self {
        Self {
            chromosome: chromosome.to_string(),
            counts: vec![0; genome_length as usize + 1],
        }
    }

    /// Count insertions per position. Several barcodes at the same position
    /// add up.
    pub fn from_insertions<'a, I>(chromosome: &str, genome_length: u32, insertions: I) -> TnseqResult<Self>
    where
        I: IntoIterator<Item = &'a AnnotatedInsertion>,
    {
        let mut series = Self::zeros(chromosome, genome_length);
        for insertion in insertions {
            if insertion.chromosome != chromosome {
                continue;
            }
            if insertion.position > genome_length {
                return Err(TnseqError::MalformedInputTable(format!(
                    "insertion at {}:{} lies beyond the chromosome length {}",
                    chromosome, insertion.position, genome_length
                )));
            }
            series.counts[insertion.position as usize] += 1;
        }
        Ok(series)
    }

    pub fn from_counts(chromosome: &str, counts: Vec<u32>) -> Self {
        Self {
            chromosome: chromosome.to_string(),
            counts,
        }
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn increment(&mut self, position: usize) {
        self.counts[position] += 1;
    }

    /// Number of entries, genome length + 1
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn genome_length(&self) -> usize {
        self.counts.len().saturating_sub(1)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Positions with at least one insertion
    pub fn occupied(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }
}

/// How a rolling window treats the ends of the sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEdges {
    /// Windows are centred on each evaluated position and shrink at the ends
    Partial,
    /// Only windows that fit completely, evaluated from the first position
    Full,
}

/// Rolling mean of `counts` with the given width and stride.
///
/// A centred window around position `i` spans `i - width/2` through
/// `i + width/2` inclusive, clipped to the sequence.
pub fn rolling_mean(counts: &[u32], width: usize, stride: usize, edges: WindowEdges) -> Vec<f64> {
    let n = counts.len();
    if n == 0 || width == 0 || stride == 0 {
        return Vec::new();
    }

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0u64);
    for &c in counts {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + c as u64);
    }

    let mean = |lo: usize, hi: usize| (prefix[hi] - prefix[lo]) as f64 / (hi - lo) as f64;
    let half = width / 2;

    match edges {
        WindowEdges::Partial => (0..n)
            .step_by(stride)
            .map(|center| {
                let lo = center.saturating_sub(half);
                let hi = (center + half + 1).min(n);
                mean(lo, hi)
            })
            .collect(),
        WindowEdges::Full => {
            if width > n {
                return Vec::new();
            }
            (0..=n - width)
                .step_by(stride)
                .map(|start| mean(start, start + width))
                .collect()
        }
    }
}

/// Fine-grained centred rolling mean of insertion counts, one value per base
#[derive(Debug, Clone, PartialEq)]
pub struct DensityProfile {
    pub chromosome: String,
    pub width: usize,
    values: Vec<f64>,
}

impl DensityProfile {
    pub fn from_series(series: &PositionSeries, width: usize) -> Self {
        Self {
            chromosome: series.chromosome.clone(),
            width,
            values: rolling_mean(series.counts(), width, 1, WindowEdges::Partial),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_all_zero(&self) -> bool {
        self.values.iter().all(|&v| v <= 0.0)
    }
}

/// Coarse rolling mean at gene scale, used for the zero-density statistic.
/// Values from different width/stride settings are not comparable.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneScaleDensity {
    pub chromosome: String,
    /// Length of the underlying position series
    pub length: usize,
    pub width: usize,
    pub stride: usize,
    values: Vec<f64>,
}

impl GeneScaleDensity {
    pub fn from_series(series: &PositionSeries, width: usize, stride: usize) -> Self {
        Self {
            chromosome: series.chromosome.clone(),
            length: series.len(),
            width,
            stride,
            values: rolling_mean(series.counts(), width, stride, WindowEdges::Full),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insertion(chromosome: &str, position: u32) -> AnnotatedInsertion {
        AnnotatedInsertion {
            chromosome: chromosome.to_string(),
            position,
            total_reads: 1,
            gene_begin: None,
            gene_end: None,
            description: None,
        }
    }

    #[test]
    fn test_series_aggregates_positions() {
        let insertions = vec![
            insertion("Ch1", 150),
            insertion("Ch1", 150),
            insertion("Ch1", 600),
            insertion("Ch2", 10),
            insertion("Ch1", 1000),
        ];
        let series = PositionSeries::from_insertions("Ch1", 1000, &insertions).unwrap();

        assert_eq!(series.len(), 1001);
        assert_eq!(series.genome_length(), 1000);
        assert_eq!(series.counts()[150], 2);
        assert_eq!(series.counts()[600], 1);
        assert_eq!(series.counts()[10], 0);
        assert_eq!(series.counts()[1000], 1);
        assert_eq!(series.total(), 4);
        assert_eq!(series.occupied(), 3);
    }

    #[test]
    fn test_series_rejects_out_of_range() {
        let insertions = vec![insertion("Ch1", 1001)];
        assert!(matches!(
            PositionSeries::from_insertions("Ch1", 1000, &insertions),
            Err(TnseqError::MalformedInputTable(_))
        ));
    }

    #[test]
    fn test_all_zero_profile() {
        let series = PositionSeries::zeros("Ch1", 500);
        let profile = DensityProfile::from_series(&series, 200);

        assert_eq!(profile.len(), 501);
        assert!(profile.values().iter().all(|&v| v == 0.0));
        assert!(profile.is_all_zero());
    }

    #[test]
    fn test_partial_edge_windows() {
        let mut counts = vec![0u32; 10];
        counts[0] = 1;
        let values = rolling_mean(&counts, 4, 1, WindowEdges::Partial);

        assert_eq!(values.len(), 10);
        // windows [0,2], [0,3], [0,4], [1,5]
        assert!((values[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((values[1] - 1.0 / 4.0).abs() < 1e-12);
        assert!((values[2] - 1.0 / 5.0).abs() < 1e-12);
        assert_eq!(values[3], 0.0);
    }

    #[test]
    fn test_window_is_symmetric() {
        let mut counts = vec![0u32; 2001];
        counts[1000] = 1;
        let series = PositionSeries::from_counts("Ch1", counts);
        let values = DensityProfile::from_series(&series, 200).values().to_vec();

        assert!(values[900] > 0.0);
        assert!(values[1100] > 0.0);
        assert_eq!(values[900], values[1100]);
        assert_eq!(values[899], 0.0);
        assert_eq!(values[1101], 0.0);

        let mut counts = vec![0u32; 2001];
        counts[100] = 1;
        let series = PositionSeries::from_counts("Ch1", counts);
        let profile = DensityProfile::from_series(&series, 200);
        // clipped window [0, 100]
        assert!((profile.values()[0] - 1.0 / 101.0).abs() < 1e-12);
    }

    #[test]
    fn test_profile_reconstructs_total() {
        let counts: Vec<u32> = (0..=10_000).map(|i| u32::from(i % 10 == 0)).collect();
        let series = PositionSeries::from_counts("Ch1", counts);
        let profile = DensityProfile::from_series(&series, 200);

        let total = series.total() as f64;
        let reconstructed: f64 = profile.values().iter().sum();
        assert!((reconstructed - total).abs() / total < 0.01);

        // interior window [4900, 5100] holds 21 insertions over 201 bases
        assert!((profile.values()[5000] - 21.0 / 201.0).abs() < 1e-12);
    }

    #[test]
    fn test_full_windows_with_stride() {
        let counts: Vec<u32> = (0..10).collect();
        let values = rolling_mean(&counts, 4, 3, WindowEdges::Full);

        // windows [0,4), [3,7), [6,10)
        assert_eq!(values, vec![1.5, 4.5, 7.5]);
    }

    #[test]
    fn test_gene_scale_density_too_short() {
        let series = PositionSeries::zeros("Ch1", 100);
        let density = GeneScaleDensity::from_series(&series, 385, 192);
        assert!(density.is_empty());

        let series = PositionSeries::zeros("Ch1", 1000);
        let density = GeneScaleDensity::from_series(&series, 385, 192);
        // 1001 bases: starts 0, 192, 384, 576
        assert_eq!(density.len(), 4);
    }
}
