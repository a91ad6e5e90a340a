//! Empirical CDF of gene-scale density and the zero-density tail probability

use crate::{density::GeneScaleDensity, TnseqError, TnseqResult};

/// Empirical cumulative distribution function over a finite sample
#[derive(Debug, Clone, PartialEq)]
pub struct Ecdf {
    sorted: Vec<f64>,
}

impl Ecdf {
    /// Returns `None` for an empty sample
    pub fn new(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self { sorted })
    }

    /// Fraction of samples less than or equal to `x`
    pub fn eval(&self, x: f64) -> f64 {
        let at_or_below = self.sorted.partition_point(|&v| v <= x);
        at_or_below as f64 / self.sorted.len() as f64
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.sorted[0]
    }

    pub fn max(&self) -> f64 {
        self.sorted[self.sorted.len() - 1]
    }
}

/// `F(0)`: the fraction of gene-scale windows without a single insertion
pub fn zero_density_probability(density: &GeneScaleDensity) -> TnseqResult<f64> {
    let ecdf = Ecdf::new(density.values()).ok_or_else(|| TnseqError::InsufficientWindows {
        chromosome: density.chromosome.clone(),
        length: density.length,
        width: density.width,
    })?;
    Ok(ecdf.eval(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::PositionSeries;

    #[test]
    fn test_ecdf_bounds_and_monotonicity() {
        let values = [0.3, 0.0, 0.1, 0.0, 0.7, 0.1, 0.25];
        let ecdf = Ecdf::new(&values).unwrap();

        assert_eq!(ecdf.eval(ecdf.min() - 1e-9), 0.0);
        assert_eq!(ecdf.eval(ecdf.max()), 1.0);
        assert_eq!(ecdf.eval(100.0), 1.0);
        assert!((ecdf.eval(0.0) - 2.0 / 7.0).abs() < 1e-12);
        assert!((ecdf.eval(0.1) - 4.0 / 7.0).abs() < 1e-12);

        let mut previous = 0.0;
        for step in 0..=100 {
            let x = -0.1 + step as f64 * 0.01;
            let current = ecdf.eval(x);
            assert!(current >= previous, "F({}) decreased", x);
            previous = current;
        }
    }

    #[test]
    fn test_empty_sample() {
        assert!(Ecdf::new(&[]).is_none());
    }

    #[test]
    fn test_zero_density_probability() {
        let mut counts = vec![0u32; 20];
        counts[1] = 1;
        counts[12] = 3;
        let series = PositionSeries::from_counts("Ch1", counts);
        // windows [0,5), [5,10), [10,15), [15,20)
        let density = GeneScaleDensity::from_series(&series, 5, 5);

        let probability = zero_density_probability(&density).unwrap();
        assert!((probability - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_insufficient_windows() {
        let series = PositionSeries::zeros("pA", 99);
        let density = GeneScaleDensity::from_series(&series, 385, 192);

        match zero_density_probability(&density) {
            Err(TnseqError::InsufficientWindows {
                chromosome,
                length,
                width,
            }) => {
                assert_eq!(chromosome, "pA");
                assert_eq!(length, 100);
                assert_eq!(width, 385);
            }
            other => panic!("Expected InsufficientWindows, got {:?}", other),
        }
    }
}
