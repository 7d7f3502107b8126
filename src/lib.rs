//! Mineral Invest: site attractiveness scoring
//!
//! Scores mineral-extraction investment opportunities from 11 numeric site
//! attributes, producing a score in [0,1].
//!
//! ## Architecture
//!
//! - **Dataset Synthesizer**: reproducible synthetic training tables
//! - **Investment Scorer**: scaling, random forest fitting, evaluation,
//!   prediction and model persistence
//! - **Shared Scorer**: snapshot-swapping handle for concurrent callers
//!
//! ```ignore
//! let table = mineral_invest::generate(200)?;
//! let mut scorer = InvestmentScorer::new(ScorerConfig::load());
//! let report = scorer.train(&table)?;
//! let score = scorer.predict(&site)?;
//! ```

pub mod config;
pub mod ml_engine;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, ScorerConfig};

// Re-export commonly used types
pub use types::{
    Feature, FeatureImportance, FeatureVector, TrainingRecord, TrainingReport, TrainingTable,
    FEATURE_NAMES, NUM_FEATURES,
};

// Re-export ML Engine types
pub use ml_engine::{
    generate, Assessment, Confidence, DatasetSynthesizer, InvestmentRating, InvestmentScorer,
    ScorerError, SharedScorer,
};
