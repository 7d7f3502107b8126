//! Error taxonomy for the scoring pipeline.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScorerError {
    /// Bad input shape or size; carries the offending fields.
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Missing required features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    /// Predict or save attempted before train or load.
    #[error("Model not initialized: {0} requires train() or load() first")]
    Uninitialized(&'static str),

    #[error("IO error ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt model bundle ({}): {reason}", path.display())]
    CorruptBundle { path: PathBuf, reason: String },
}

impl ScorerError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }
}
