//! Scorer configuration: synthesizer, partitioning and forest hyperparameters
//! loaded from TOML, with built-in defaults for every field.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming a config file to load.
pub const CONFIG_ENV_VAR: &str = "MINERAL_INVEST_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "scorer_config.toml";

/// Top-level configuration.
///
/// After deserialization, all `#[serde(default)]` fields have values regardless
/// of whether the file set them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    #[serde(default)]
    pub synthesizer: SynthesizerConfig,

    #[serde(default)]
    pub training: TrainingConfig,

    #[serde(default)]
    pub forest: ForestConfig,
}

impl ScorerConfig {
    /// Load using the standard search order:
    ///
    /// 1. `MINERAL_INVEST_CONFIG` environment variable
    /// 2. `./scorer_config.toml`
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded scorer config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded scorer config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No scorer config found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys are logged, not fatal.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        for w in super::validation::check_suspicious_values(&config) {
            warn!(field = %w.field, "{}", w);
        }
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Scorer config saved");
        Ok(())
    }

    /// Validate every section, collecting all problems.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let s = &self.synthesizer;
        if !s.noise_std.is_finite() || s.noise_std < 0.0 {
            errors.push(format!(
                "synthesizer.noise_std ({}) must be finite and >= 0",
                s.noise_std
            ));
        }

        let t = &self.training;
        if !(t.test_fraction > 0.0 && t.test_fraction < 1.0) {
            errors.push(format!(
                "training.test_fraction ({}) must be in (0, 1)",
                t.test_fraction
            ));
        }

        let f = &self.forest;
        if f.n_trees == 0 {
            errors.push("forest.n_trees must be at least 1".to_string());
        }
        if f.max_depth == 0 {
            errors.push("forest.max_depth must be at least 1".to_string());
        }
        if f.min_samples_split < 2 {
            errors.push(format!(
                "forest.min_samples_split ({}) must be at least 2",
                f.min_samples_split
            ));
        }
        if f.min_samples_leaf == 0 {
            errors.push("forest.min_samples_leaf must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Synthetic dataset generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    /// RNG seed; the same seed and row count give identical tables
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Standard deviation of Gaussian noise added to the normalized target
    #[serde(default = "default_noise_std")]
    pub noise_std: f64,
}

fn default_seed() -> u64 {
    42
}
fn default_noise_std() -> f64 {
    0.05
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            noise_std: default_noise_std(),
        }
    }
}

/// Train/test partitioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    #[serde(default = "default_seed")]
    pub split_seed: u64,
}

fn default_test_fraction() -> f64 {
    0.2
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: default_test_fraction(),
            split_seed: default_seed(),
        }
    }
}

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Nodes with fewer rows become leaves
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,

    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,

    /// Tree `i` is seeded with `seed + i`
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_n_trees() -> usize {
    100
}
fn default_max_depth() -> usize {
    10
}
fn default_min_samples_split() -> usize {
    5
}
fn default_min_samples_leaf() -> usize {
    1
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            seed: default_seed(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            Self::Serialize(e) => write!(f, "Config serialization error: {}", e),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}
