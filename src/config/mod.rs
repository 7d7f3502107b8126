//! Scorer Configuration Module
//!
//! Hyperparameters for dataset synthesis, partitioning and the forest,
//! loaded from TOML files.
//!
//! ## Loading Order
//!
//! 1. `MINERAL_INVEST_CONFIG` environment variable (path to TOML file)
//! 2. `scorer_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded config is passed explicitly to the components that need it;
//! there is no process-wide config instance.

mod scorer_config;
pub mod validation;

pub use scorer_config::*;
