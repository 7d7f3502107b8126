//! Training outputs returned to callers of `InvestmentScorer::train`.

use serde::{Deserialize, Serialize};

/// Relative contribution of one feature to the forest's splits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Evaluation metrics for a completed training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Mean squared error on the training partition
    pub train_mse: f64,
    /// Mean squared error on the held-out partition
    pub test_mse: f64,
    /// Coefficient of determination on the training partition
    pub train_r2: f64,
    /// Coefficient of determination on the held-out partition
    pub test_r2: f64,
    /// Importances sorted descending, summing to 1
    pub feature_importance: Vec<FeatureImportance>,
    /// Rows used to fit the scaler and forest
    pub n_train: usize,
    /// Held-out rows
    pub n_test: usize,
    /// Trees in the fitted ensemble
    pub n_trees: usize,
}

impl TrainingReport {
    /// The `n` most important feature names.
    pub fn top_features(&self, n: usize) -> Vec<String> {
        self.feature_importance
            .iter()
            .take(n)
            .map(|f| f.feature.clone())
            .collect()
    }
}
