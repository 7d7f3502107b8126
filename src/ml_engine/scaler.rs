//! Standard feature scaling (zero mean, unit variance).
//!
//! Fitted once from the training partition and frozen afterwards. The same
//! statistics are applied to the held-out partition and to every prediction
//! input, so held-out rows never influence the fitted state.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use super::error::ScorerError;
use crate::types::NUM_FEATURES;

/// Per-feature mean and population standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    n_samples: usize,
    mean: [f64; NUM_FEATURES],
    scale: [f64; NUM_FEATURES],
}

impl StandardScaler {
    /// Fit statistics from raw feature rows.
    pub fn fit(rows: &[[f64; NUM_FEATURES]]) -> Result<Self, ScorerError> {
        if rows.is_empty() {
            return Err(ScorerError::validation("cannot fit scaler on zero rows"));
        }

        let mut mean = [0.0; NUM_FEATURES];
        let mut scale = [1.0; NUM_FEATURES];
        for j in 0..NUM_FEATURES {
            let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            mean[j] = column.iter().mean();
            let std = column.iter().population_std_dev();
            // Constant columns pass through centred but unscaled
            scale[j] = if std.is_finite() && std > 1e-12 { std } else { 1.0 };
        }

        Ok(Self {
            n_samples: rows.len(),
            mean,
            scale,
        })
    }

    /// Scale a single raw row.
    pub fn transform(&self, raw: &[f64; NUM_FEATURES]) -> [f64; NUM_FEATURES] {
        let mut out = [0.0; NUM_FEATURES];
        for (j, x) in out.iter_mut().enumerate() {
            *x = (raw[j] - self.mean[j]) / self.scale[j];
        }
        out
    }

    pub fn transform_rows(&self, rows: &[[f64; NUM_FEATURES]]) -> Vec<[f64; NUM_FEATURES]> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    pub const fn mean(&self) -> &[f64; NUM_FEATURES] {
        &self.mean
    }

    pub const fn scale(&self) -> &[f64; NUM_FEATURES] {
        &self.scale
    }

    /// Number of rows the statistics were fitted on.
    pub const fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Structural check used when restoring from a bundle.
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err("scaler mean contains non-finite values".to_string());
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err("scaler scale must be finite and positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_mean_and_std() {
        let mut rows = Vec::new();
        for i in 0..4 {
            let mut r = [5.0; NUM_FEATURES];
            r[0] = f64::from(i); // 0,1,2,3
            rows.push(r);
        }
        let scaler = StandardScaler::fit(&rows).expect("fit");
        assert!((scaler.mean()[0] - 1.5).abs() < 1e-12);
        // population std of 0..3
        assert!((scaler.scale()[0] - 1.25_f64.sqrt()).abs() < 1e-12);
        assert_eq!(scaler.n_samples(), 4);
    }

    #[test]
    fn test_constant_column_scale_is_one() {
        let rows = vec![[3.0; NUM_FEATURES]; 10];
        let scaler = StandardScaler::fit(&rows).expect("fit");
        assert_eq!(scaler.scale()[4], 1.0);
        let t = scaler.transform(&[3.0; NUM_FEATURES]);
        assert!(t.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_transformed_training_rows_standardized() {
        let rows: Vec<[f64; NUM_FEATURES]> = (0..100)
            .map(|i| {
                let mut r = [0.0; NUM_FEATURES];
                for (j, x) in r.iter_mut().enumerate() {
                    *x = f64::from(i) * (j as f64 + 1.0) + 7.0;
                }
                r
            })
            .collect();
        let scaler = StandardScaler::fit(&rows).expect("fit");
        let scaled = scaler.transform_rows(&rows);
        for j in 0..NUM_FEATURES {
            let col: Vec<f64> = scaled.iter().map(|r| r[j]).collect();
            assert!(col.iter().mean().abs() < 1e-9);
            assert!((col.iter().population_std_dev() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            StandardScaler::fit(&[]),
            Err(ScorerError::Validation(_))
        ));
    }
}
