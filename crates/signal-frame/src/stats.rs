//! Column Statistics

use serde::{Deserialize, Serialize};

/// Descriptive statistics of a numeric column, NaN samples excluded
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Finite samples
    pub count: usize,
    /// NaN samples
    pub nan_count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

impl ColumnStats {
    /// Compute statistics over the finite samples of `values`
    pub fn compute(values: &[f64]) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let nan_count = values.len() - finite.len();

        if finite.is_empty() {
            return Self {
                nan_count,
                ..Self::default()
            };
        }

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let min = finite.iter().copied().fold(f64::MAX, f64::min);
        let max = finite.iter().copied().fold(f64::MIN, f64::max);
        let variance = finite.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

        Self {
            count: finite.len(),
            nan_count,
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_stats() {
        let stats = ColumnStats::compute(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.count, 8);
        assert!((stats.mean - 5.0).abs() < 1e-9);
        assert!((stats.std_dev - 2.0).abs() < 1e-9);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn test_nan_excluded() {
        let stats = ColumnStats::compute(&[1.0, f64::NAN, 3.0]);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.nan_count, 1);
        assert!((stats.mean - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_values() {
        let stats = ColumnStats::compute(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, 0.0);
    }
}
