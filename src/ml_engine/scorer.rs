//! Investment scorer: fits the scaler and forest, evaluates them, and scores
//! single sites.
//!
//! ## Lifecycle
//!
//! untrained -> trained (by `train` or `load`) -> persisted / reloaded.
//! The scaler and forest are always fitted together and replaced together;
//! a failed `train` or `load` leaves the previous state untouched.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::bundle::{self, ModelBundle};
use super::error::ScorerError;
use super::forest::RandomForest;
use super::metrics::{mean_squared_error, r2_score};
use super::rating::Assessment;
use super::scaler::StandardScaler;
use super::split::train_test_split;
use crate::config::ScorerConfig;
use crate::types::{FeatureImportance, FeatureVector, TrainingReport, TrainingTable, FEATURE_NAMES};

/// Number of top-importance features reported as key factors.
const KEY_FACTOR_COUNT: usize = 3;

/// A fitted scaler and forest plus the feature order they share.
///
/// Immutable once built; holds no reference to the training table.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    pub forest: RandomForest,
    pub trained_at: DateTime<Utc>,
}

impl TrainedModel {
    /// Score one site, clamped into [0,1].
    pub fn score(&self, features: &FeatureVector) -> f64 {
        let scaled = self.scaler.transform(&features.to_array());
        self.forest.predict(&scaled).clamp(0.0, 1.0)
    }

    /// Feature importances, most important first.
    pub fn ranked_importances(&self) -> Vec<FeatureImportance> {
        let mut ranked: Vec<FeatureImportance> = self
            .feature_names
            .iter()
            .zip(self.forest.importances())
            .map(|(name, &importance)| FeatureImportance {
                feature: name.clone(),
                importance,
            })
            .collect();
        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        ranked
    }

    pub fn key_factors(&self) -> Vec<String> {
        self.ranked_importances()
            .into_iter()
            .take(KEY_FACTOR_COUNT)
            .map(|f| f.feature)
            .collect()
    }
}

/// Fit a fresh model on `table` without touching any scorer state.
pub fn fit_model(
    table: &TrainingTable,
    config: &ScorerConfig,
) -> Result<(TrainedModel, TrainingReport), ScorerError> {
    let bad_cells = table.invalid_cells();
    if !bad_cells.is_empty() {
        return Err(ScorerError::Validation(bad_cells));
    }

    let partition = train_test_split(
        table.len(),
        config.training.test_fraction,
        config.training.split_seed,
    )?;

    // Scaler sees the training partition only
    let train_raw = table.feature_rows(&partition.train);
    let test_raw = table.feature_rows(&partition.test);
    let scaler = StandardScaler::fit(&train_raw)?;
    let train_x = scaler.transform_rows(&train_raw);
    let test_x = scaler.transform_rows(&test_raw);
    let train_y = table.targets(&partition.train);
    let test_y = table.targets(&partition.test);

    debug!(
        n_train = train_x.len(),
        n_test = test_x.len(),
        "Scaler fitted on training partition"
    );

    let forest = RandomForest::fit(&train_x, &train_y, &config.forest)?;

    let train_pred = forest.predict_rows(&train_x);
    let test_pred = forest.predict_rows(&test_x);

    let model = TrainedModel {
        feature_names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
        scaler,
        forest,
        trained_at: Utc::now(),
    };

    let report = TrainingReport {
        train_mse: mean_squared_error(&train_y, &train_pred),
        test_mse: mean_squared_error(&test_y, &test_pred),
        train_r2: r2_score(&train_y, &train_pred),
        test_r2: r2_score(&test_y, &test_pred),
        feature_importance: model.ranked_importances(),
        n_train: train_x.len(),
        n_test: test_x.len(),
        n_trees: model.forest.n_trees(),
    };

    Ok((model, report))
}

/// Owns one model's state. Construct once and pass by reference to callers.
#[derive(Debug, Clone, Default)]
pub struct InvestmentScorer {
    config: ScorerConfig,
    model: Option<TrainedModel>,
}

impl InvestmentScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self {
            config,
            model: None,
        }
    }

    /// Fit on `table`, replacing any previous model on success.
    pub fn train(&mut self, table: &TrainingTable) -> Result<TrainingReport, ScorerError> {
        let (model, report) = fit_model(table, &self.config)?;
        info!(
            n_train = report.n_train,
            n_test = report.n_test,
            train_mse = report.train_mse,
            test_mse = report.test_mse,
            train_r2 = report.train_r2,
            test_r2 = report.test_r2,
            "Investment model trained"
        );
        self.model = Some(model);
        Ok(report)
    }

    /// Score a site. Requires a trained or loaded model.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, ScorerError> {
        let model = self.model.as_ref().ok_or(ScorerError::Uninitialized("predict"))?;
        let bad = features.non_finite_features();
        if !bad.is_empty() {
            return Err(ScorerError::Validation(bad));
        }
        Ok(model.score(features))
    }

    /// Score a site given as a name-keyed map; every feature name is required.
    pub fn predict_map(&self, features: &HashMap<String, f64>) -> Result<f64, ScorerError> {
        if self.model.is_none() {
            return Err(ScorerError::Uninitialized("predict"));
        }
        let fv = FeatureVector::from_map(features).map_err(ScorerError::MissingFeatures)?;
        self.predict(&fv)
    }

    /// Score a site and classify the result.
    pub fn assess(&self, features: &FeatureVector) -> Result<Assessment, ScorerError> {
        let score = self.predict(features)?;
        let key_factors = self
            .model
            .as_ref()
            .map(TrainedModel::key_factors)
            .unwrap_or_default();
        Ok(Assessment::from_score(score, key_factors))
    }

    /// Write the current model as a versioned bundle.
    pub fn save(&self, path: &Path) -> Result<(), ScorerError> {
        let model = self.model.as_ref().ok_or(ScorerError::Uninitialized("save"))?;
        bundle::save_to_disk(&ModelBundle::from_model(model), path)
    }

    /// Replace the current model with a validated bundle from disk.
    pub fn load(&mut self, path: &Path) -> Result<(), ScorerError> {
        let bundle = bundle::load_from_disk(path)?;
        info!(
            path = %path.display(),
            trained_at = %bundle.trained_at,
            n_trees = bundle.forest.n_trees(),
            max_depth = bundle.forest.config().max_depth,
            "Model bundle loaded"
        );
        self.model = Some(bundle.into_model());
        Ok(())
    }

    pub const fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.model.as_ref().map(|m| &m.scaler)
    }

    pub const fn config(&self) -> &ScorerConfig {
        &self.config
    }
}
