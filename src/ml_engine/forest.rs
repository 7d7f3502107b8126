//! Bagged ensemble of regression trees.
//!
//! Each tree is grown on a bootstrap resample of the scaled training rows.
//! Tree `i` owns an RNG seeded with `seed + i`, so fitting in parallel gives
//! the same forest as fitting sequentially, and predictions average the trees
//! in index order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ScorerError;
use super::tree::{RegressionTree, TreeParams};
use crate::config::ForestConfig;
use crate::types::NUM_FEATURES;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    /// Hyperparameters the forest was grown with (provenance only)
    config: ForestConfig,
    trees: Vec<RegressionTree>,
    /// Mean decrease in impurity per feature, summing to 1
    importances: [f64; NUM_FEATURES],
}

impl RandomForest {
    /// Fit on scaled rows `x` with targets `y`.
    pub fn fit(x: &[[f64; NUM_FEATURES]], y: &[f64], config: &ForestConfig) -> Result<Self, ScorerError> {
        if x.len() != y.len() {
            return Err(ScorerError::validation(format!(
                "rows: {} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(ScorerError::validation("rows: cannot fit forest on zero rows"));
        }
        if config.n_trees == 0 {
            return Err(ScorerError::validation("forest.n_trees must be at least 1"));
        }

        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
        };
        let n = x.len();

        let fitted: Vec<(RegressionTree, [f64; NUM_FEATURES])> = (0..config.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(i as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, sample, params, &mut rng)
            })
            .collect();

        let mut importances = [0.0; NUM_FEATURES];
        for (_, raw) in &fitted {
            let total: f64 = raw.iter().sum();
            if total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(raw) {
                    *acc += v / total;
                }
            }
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for v in &mut importances {
                *v /= total;
            }
        } else {
            // No tree managed a split (e.g. constant target)
            importances = [1.0 / NUM_FEATURES as f64; NUM_FEATURES];
        }

        let trees: Vec<RegressionTree> = fitted.into_iter().map(|(t, _)| t).collect();
        debug!(
            n_trees = trees.len(),
            rows = n,
            mean_nodes = trees.iter().map(RegressionTree::node_count).sum::<usize>() / trees.len(),
            "Random forest fitted"
        );

        Ok(Self {
            config: config.clone(),
            trees,
            importances,
        })
    }

    /// Average of all tree predictions for one scaled row.
    pub fn predict(&self, x: &[f64; NUM_FEATURES]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(x)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn predict_rows(&self, rows: &[[f64; NUM_FEATURES]]) -> Vec<f64> {
        rows.iter().map(|r| self.predict(r)).collect()
    }

    pub const fn importances(&self) -> &[f64; NUM_FEATURES] {
        &self.importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub const fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Structural check used when restoring from a bundle.
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.check().map_err(|e| format!("tree {i}: {e}"))?;
        }
        if self.importances.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err("feature importances must be finite and non-negative".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_trees: 20,
            ..ForestConfig::default()
        }
    }

    /// y depends on feature 2 (strongly) and feature 5 (weakly).
    fn linear_data(n: u32) -> (Vec<[f64; NUM_FEATURES]>, Vec<f64>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..n {
            let mut row = [0.0; NUM_FEATURES];
            row[2] = f64::from(i % 17) / 17.0;
            row[5] = f64::from(i % 5) / 5.0;
            row[9] = f64::from((i * 7) % 11); // noise feature
            y.push(0.8 * row[2] + 0.1 * row[5]);
            x.push(row);
        }
        (x, y)
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = linear_data(120);
        let a = RandomForest::fit(&x, &y, &small_config()).expect("fit");
        let b = RandomForest::fit(&x, &y, &small_config()).expect("fit");
        assert_eq!(a, b);
    }

    #[test]
    fn test_importances_ranked_and_normalized() {
        let (x, y) = linear_data(200);
        let forest = RandomForest::fit(&x, &y, &small_config()).expect("fit");
        let imp = forest.importances();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp[2] > imp[5]);
        assert!(imp[2] > 0.5);
    }

    #[test]
    fn test_predictions_track_target() {
        let (x, y) = linear_data(200);
        let forest = RandomForest::fit(&x, &y, &small_config()).expect("fit");
        let preds = forest.predict_rows(&x);
        let r2 = super::super::metrics::r2_score(&y, &preds);
        assert!(r2 > 0.9, "train r2 = {r2}");
    }

    #[test]
    fn test_constant_target_gives_uniform_importance() {
        let (x, _) = linear_data(50);
        let y = vec![0.3; 50];
        let forest = RandomForest::fit(&x, &y, &small_config()).expect("fit");
        assert!((forest.predict(&x[0]) - 0.3).abs() < 1e-12);
        assert!(forest
            .importances()
            .iter()
            .all(|v| (v - 1.0 / NUM_FEATURES as f64).abs() < 1e-12));
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let (x, _) = linear_data(10);
        assert!(RandomForest::fit(&x, &[0.0; 3], &small_config()).is_err());
    }

    #[test]
    fn test_serde_round_trip_preserves_predictions() {
        let (x, y) = linear_data(80);
        let forest = RandomForest::fit(&x, &y, &small_config()).expect("fit");
        let json = serde_json::to_string(&forest).expect("serialize");
        let restored: RandomForest = serde_json::from_str(&json).expect("deserialize");
        restored.check().expect("valid");
        assert_eq!(restored.config(), &small_config());
        for row in &x {
            assert_eq!(forest.predict(row).to_bits(), restored.predict(row).to_bits());
        }
    }
}
