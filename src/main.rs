//! Mineral Invest - command line front end
//!
//! Generates synthetic training data, trains and saves the investment model,
//! and scores sites from JSON feature maps.
//!
//! # Usage
//!
//! ```bash
//! # Synthetic training table
//! mineral-invest generate --rows 200 --output sites.json
//!
//! # Train on it (or on --rows N freshly generated rows) and save the bundle
//! mineral-invest train --data sites.json --model model.json
//!
//! # Score a site
//! echo '{"reserve_tonnes": 5000, ...}' | mineral-invest predict --model model.json
//! ```
//!
//! # Environment Variables
//!
//! - `MINERAL_INVEST_CONFIG`: Path to a scorer config TOML file
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use mineral_invest::{
    DatasetSynthesizer, FeatureVector, InvestmentScorer, ScorerConfig, ScorerError, TrainingTable,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "mineral-invest")]
#[command(about = "Mineral extraction investment scoring")]
#[command(version)]
struct CliArgs {
    /// Scorer config TOML (overrides MINERAL_INVEST_CONFIG and ./scorer_config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a synthetic training table as JSON
    Generate {
        /// Number of rows
        #[arg(short, long, default_value = "200")]
        rows: usize,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train the model, print its metrics and save the bundle
    Train {
        /// Training table JSON produced by `generate` or an external source
        #[arg(long, conflicts_with = "rows")]
        data: Option<PathBuf>,
        /// Train on this many freshly generated synthetic rows
        #[arg(long, default_value = "200")]
        rows: usize,
        /// Where to write the model bundle
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Score one site from a JSON object of feature values
    Predict {
        /// Model bundle written by `train`
        #[arg(short, long)]
        model: PathBuf,
        /// Feature JSON file (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

// ============================================================================
// Main
// ============================================================================

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // Logs go to stderr so stdout stays machine-readable
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<ScorerConfig> {
    match path {
        Some(p) => ScorerConfig::load_from_file(p)
            .with_context(|| format!("loading config {}", p.display())),
        None => Ok(ScorerConfig::load()),
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.json_logs);

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Generate { rows, output } => {
            let table = DatasetSynthesizer::new(&config.synthesizer)
                .generate(rows)
                .context("generating synthetic table")?;
            let json = serde_json::to_string_pretty(&table)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(rows, path = %path.display(), "Synthetic table written");
                }
                None => println!("{json}"),
            }
        }

        Command::Train { data, rows, model } => {
            let table = match data {
                Some(path) => read_table(&path)?,
                None => DatasetSynthesizer::new(&config.synthesizer)
                    .generate(rows)
                    .context("generating synthetic table")?,
            };
            let mut scorer = InvestmentScorer::new(config);
            info!(
                rows = table.len(),
                n_trees = scorer.config().forest.n_trees,
                max_depth = scorer.config().forest.max_depth,
                "Training investment model"
            );
            let report = scorer.train(&table).context("training failed")?;
            scorer
                .save(&model)
                .with_context(|| format!("saving model to {}", model.display()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Predict { model, input } => {
            let mut scorer = InvestmentScorer::new(config);
            scorer
                .load(&model)
                .with_context(|| format!("loading model {}", model.display()))?;

            let raw = match input {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("reading features from stdin")?;
                    buf
                }
            };
            let site = numeric_fields(&raw)?;
            let fv = FeatureVector::from_map(&site).map_err(ScorerError::MissingFeatures)?;
            let assessment = scorer.assess(&fv)?;
            info!(score = assessment.investment_score, rating = %assessment.rating, "Site scored");
            println!("{}", serde_json::to_string_pretty(&assessment)?);
        }
    }

    Ok(())
}

/// Numeric members of a JSON object. Other members are skipped with a warning
/// so descriptive fields (site name, region) can ride along with the features.
fn numeric_fields(raw: &str) -> Result<HashMap<String, f64>> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(raw).context("features must be a JSON object")?;
    let mut site = HashMap::with_capacity(object.len());
    for (key, value) in object {
        match value.as_f64() {
            Some(v) => {
                site.insert(key, v);
            }
            None => warn!(key = %key, "Ignoring non-numeric input field"),
        }
    }
    Ok(site)
}

fn read_table(path: &Path) -> Result<TrainingTable> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading training table {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing training table {}", path.display()))
}
