//! ML Engine for mineral investment scoring
//!
//! Trainer-then-predictor pipeline mapping the 11 site features to an
//! attractiveness score in [0,1].
//!
//! ## Key Features
//! - Reproducible synthetic training data with realistic feature shapes
//! - Leakage-free standard scaling (fitted on the training partition only)
//! - Bagged regression-tree ensemble fitted in parallel (rayon)
//! - MSE / R² evaluation and ranked impurity-based feature importances
//! - Versioned, validated model bundles with atomic writes
//! - Lock-free model snapshots for concurrent serving (arc-swap)
//!
//! ## Architecture
//! - `synthesizer`: Synthetic training tables (rand_distr)
//! - `split`: Seeded train/test partitioning
//! - `scaler`: Per-feature mean / std normalization (statrs)
//! - `tree`: CART regression tree on a flat node arena
//! - `forest`: Bootstrap ensemble and importance aggregation
//! - `metrics`: MSE and R²
//! - `scorer`: `InvestmentScorer` train / predict / save / load
//! - `bundle`: On-disk model format
//! - `shared`: `SharedScorer` handle for multi-threaded callers
//! - `rating`: Score classification and recommendations

pub mod bundle;
pub mod error;
pub mod forest;
pub mod metrics;
pub mod rating;
pub mod scaler;
pub mod scorer;
pub mod shared;
pub mod split;
pub mod synthesizer;
pub mod tree;

// Re-export public types
pub use bundle::{ModelBundle, BUNDLE_FORMAT_VERSION};
pub use error::ScorerError;
pub use forest::RandomForest;
pub use rating::{Assessment, Confidence, InvestmentRating, Recommendation};
pub use scaler::StandardScaler;
pub use scorer::{fit_model, InvestmentScorer, TrainedModel};
pub use shared::SharedScorer;
pub use split::{train_test_split, Partition};
pub use synthesizer::{generate, DatasetSynthesizer};
