//! Cloneable scorer handle for concurrent serving.
//!
//! Readers score against an immutable `Arc<TrainedModel>` snapshot loaded
//! through `ArcSwapOption`, so predictions never block and never observe a
//! half-replaced model. `train` and `load` build the replacement off to the
//! side, serialized by a writer mutex, then publish it with one atomic swap.

use arc_swap::ArcSwapOption;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use super::bundle::{self, ModelBundle};
use super::error::ScorerError;
use super::rating::Assessment;
use super::scorer::{fit_model, TrainedModel};
use crate::config::ScorerConfig;
use crate::types::{FeatureVector, TrainingReport, TrainingTable};

struct Inner {
    config: ScorerConfig,
    model: ArcSwapOption<TrainedModel>,
    /// Serializes writers; readers never take it
    writer: Mutex<()>,
}

#[derive(Clone)]
pub struct SharedScorer {
    inner: Arc<Inner>,
}

impl SharedScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                model: ArcSwapOption::empty(),
                writer: Mutex::new(()),
            }),
        }
    }

    /// Current model snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<TrainedModel>> {
        self.inner.model.load_full()
    }

    pub fn is_trained(&self) -> bool {
        self.inner.model.load().is_some()
    }

    pub fn train(&self, table: &TrainingTable) -> Result<TrainingReport, ScorerError> {
        let _guard = self.lock_writer();
        let (model, report) = fit_model(table, &self.inner.config)?;
        self.inner.model.store(Some(Arc::new(model)));
        info!(
            n_train = report.n_train,
            test_r2 = report.test_r2,
            "Shared scorer retrained"
        );
        Ok(report)
    }

    pub fn load(&self, path: &Path) -> Result<(), ScorerError> {
        let _guard = self.lock_writer();
        let model = bundle::load_from_disk(path)?.into_model();
        self.inner.model.store(Some(Arc::new(model)));
        info!(path = %path.display(), "Shared scorer reloaded");
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), ScorerError> {
        let _guard = self.lock_writer();
        let model = self.snapshot().ok_or(ScorerError::Uninitialized("save"))?;
        bundle::save_to_disk(&ModelBundle::from_model(&model), path)
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<f64, ScorerError> {
        let guard = self.inner.model.load();
        let model = (*guard).as_ref().ok_or(ScorerError::Uninitialized("predict"))?;
        let bad = features.non_finite_features();
        if !bad.is_empty() {
            return Err(ScorerError::Validation(bad));
        }
        Ok(model.score(features))
    }

    pub fn predict_map(&self, features: &HashMap<String, f64>) -> Result<f64, ScorerError> {
        if !self.is_trained() {
            return Err(ScorerError::Uninitialized("predict"));
        }
        let fv = FeatureVector::from_map(features).map_err(ScorerError::MissingFeatures)?;
        self.predict(&fv)
    }

    /// Score and classify against a single snapshot.
    pub fn assess(&self, features: &FeatureVector) -> Result<Assessment, ScorerError> {
        let model = self.snapshot().ok_or(ScorerError::Uninitialized("predict"))?;
        let bad = features.non_finite_features();
        if !bad.is_empty() {
            return Err(ScorerError::Validation(bad));
        }
        Ok(Assessment::from_score(model.score(features), model.key_factors()))
    }

    fn lock_writer(&self) -> std::sync::MutexGuard<'_, ()> {
        // The guarded value is (), so a poisoned lock carries no broken state
        self.inner.writer.lock().unwrap_or_else(|poisoned| {
            warn!("Scorer writer lock poisoned, continuing");
            poisoned.into_inner()
        })
    }
}

impl std::fmt::Debug for SharedScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedScorer")
            .field("trained", &self.is_trained())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForestConfig;
    use crate::ml_engine::synthesizer::generate;
    use crate::types::NUM_FEATURES;

    fn fast_config() -> ScorerConfig {
        ScorerConfig {
            forest: ForestConfig {
                n_trees: 10,
                ..ForestConfig::default()
            },
            ..ScorerConfig::default()
        }
    }

    #[test]
    fn test_untrained_handle() {
        let shared = SharedScorer::new(fast_config());
        assert!(!shared.is_trained());
        let site = FeatureVector::from_array([1.0; NUM_FEATURES]);
        assert!(matches!(shared.predict(&site), Err(ScorerError::Uninitialized(_))));
    }

    #[test]
    fn test_concurrent_reads_during_retrain() {
        let shared = SharedScorer::new(fast_config());
        let table = generate(80).expect("generate");
        shared.train(&table).expect("train");

        let site = FeatureVector::from_array([0.5; NUM_FEATURES]);
        let expected = shared.predict(&site).expect("predict");

        std::thread::scope(|s| {
            for _ in 0..4 {
                let reader = shared.clone();
                s.spawn(move || {
                    for _ in 0..50 {
                        let score = reader.predict(&site).expect("predict");
                        // Retraining on the same table yields the same forest
                        assert_eq!(score, expected);
                    }
                });
            }
            let writer = shared.clone();
            let table = &table;
            s.spawn(move || {
                for _ in 0..3 {
                    writer.train(table).expect("retrain");
                }
            });
        });
    }

    #[test]
    fn test_concurrent_saves_from_clones() {
        let shared = SharedScorer::new(fast_config());
        shared.train(&generate(60).expect("generate")).expect("train");
        let dir = tempfile::tempdir().expect("tmpdir");
        let path = dir.path().join("model.json");

        std::thread::scope(|s| {
            for _ in 0..4 {
                let handle = shared.clone();
                let path = &path;
                s.spawn(move || {
                    for _ in 0..30 {
                        handle.save(path).expect("save");
                    }
                });
            }
        });

        let reloaded = SharedScorer::new(fast_config());
        reloaded.load(&path).expect("load");
        let site = FeatureVector::from_array([0.5; NUM_FEATURES]);
        assert_eq!(
            reloaded.predict(&site).expect("predict").to_bits(),
            shared.predict(&site).expect("predict").to_bits()
        );
        let stray = std::fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|e| e.path() != path)
            .count();
        assert_eq!(stray, 0);
    }

    #[test]
    fn test_snapshot_survives_swap() {
        let shared = SharedScorer::new(fast_config());
        shared.train(&generate(80).expect("generate")).expect("train");
        let old = shared.snapshot().expect("snapshot");
        shared.train(&generate(120).expect("generate")).expect("retrain");
        let new = shared.snapshot().expect("snapshot");
        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(old.forest.n_trees(), 10);
    }
}
