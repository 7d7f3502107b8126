//! Versioned on-disk model bundle.
//!
//! A bundle carries everything needed to score: the feature order, the
//! fitted scaler and the forest, plus provenance timestamps. It is written
//! atomically (temp file, then rename) and fully validated on load before any
//! scorer state is replaced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

use super::error::ScorerError;
use super::forest::RandomForest;
use super::scaler::StandardScaler;
use super::scorer::TrainedModel;
use crate::types::FEATURE_NAMES;

/// Current bundle format version.
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    /// Format version for compatibility checks on load.
    pub format_version: u32,
    /// When the bundle was written.
    pub created_at: DateTime<Utc>,
    /// When the model was trained.
    pub trained_at: DateTime<Utc>,
    /// Feature order the scaler and forest were fitted with.
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    pub forest: RandomForest,
}

impl ModelBundle {
    pub fn from_model(model: &TrainedModel) -> Self {
        Self {
            format_version: BUNDLE_FORMAT_VERSION,
            created_at: Utc::now(),
            trained_at: model.trained_at,
            feature_names: model.feature_names.clone(),
            scaler: model.scaler.clone(),
            forest: model.forest.clone(),
        }
    }

    pub fn into_model(self) -> TrainedModel {
        TrainedModel {
            feature_names: self.feature_names,
            scaler: self.scaler,
            forest: self.forest,
            trained_at: self.trained_at,
        }
    }

    /// Check that the bundle can drive this build's scorer.
    pub fn validate(&self) -> Result<(), String> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {})",
                self.format_version, BUNDLE_FORMAT_VERSION
            ));
        }
        if self.feature_names.len() != FEATURE_NAMES.len() {
            return Err(format!(
                "feature list has {} names, expected {}",
                self.feature_names.len(),
                FEATURE_NAMES.len()
            ));
        }
        for (i, (got, want)) in self.feature_names.iter().zip(FEATURE_NAMES).enumerate() {
            if got != want {
                return Err(format!("feature {i} is '{got}', expected '{want}'"));
            }
        }
        self.scaler.check()?;
        self.forest.check()?;
        Ok(())
    }
}

/// Save a bundle to disk atomically (write temp file, then rename).
pub fn save_to_disk(bundle: &ModelBundle, path: &Path) -> Result<(), ScorerError> {
    let io_err = |source| ScorerError::Io {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_vec(bundle).map_err(|e| io_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    // One temp file per write; concurrent savers must not share it
    let tmp_path = temp_path_for(path);
    let tmp_err = |source| ScorerError::Io {
        path: tmp_path.clone(),
        source,
    };
    if let Err(e) = std::fs::write(&tmp_path, &json) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(tmp_err(e));
    }
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        if let Err(cleanup) = std::fs::remove_file(&tmp_path) {
            warn!(path = %tmp_path.display(), error = %cleanup, "Failed to remove temp bundle");
        }
        return Err(io_err(e));
    }

    info!(path = %path.display(), bytes = json.len(), "Model bundle saved");
    Ok(())
}

/// `<file>.<pid>.<seq>.tmp` next to `path`.
fn temp_path_for(path: &Path) -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map_or_else(|| "bundle".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!("{name}.{}.{seq}.tmp", std::process::id()))
}

/// Load and validate a bundle from disk.
pub fn load_from_disk(path: &Path) -> Result<ModelBundle, ScorerError> {
    let data = std::fs::read(path).map_err(|source| ScorerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let corrupt = |reason: String| ScorerError::CorruptBundle {
        path: path.to_path_buf(),
        reason,
    };

    // Check the version before the full schema so older bundles get a clear error
    let value: serde_json::Value =
        serde_json::from_slice(&data).map_err(|e| corrupt(format!("invalid JSON: {e}")))?;
    match value.get("format_version").and_then(serde_json::Value::as_u64) {
        Some(v) if v == u64::from(BUNDLE_FORMAT_VERSION) => {}
        Some(v) => {
            return Err(corrupt(format!(
                "unsupported format version {v} (expected {BUNDLE_FORMAT_VERSION})"
            )))
        }
        None => return Err(corrupt("missing format_version".to_string())),
    }

    let bundle: ModelBundle =
        serde_json::from_value(value).map_err(|e| corrupt(format!("schema mismatch: {e}")))?;
    bundle.validate().map_err(corrupt)?;
    Ok(bundle)
}
