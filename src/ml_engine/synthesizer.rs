//! Synthetic training data for bootstrapping the scorer.
//!
//! Each feature is drawn from a distribution shaped like its real-world
//! counterpart, and the target is a fixed weighted combination of the
//! features, min-max normalized over the batch with a little Gaussian noise.
//! Seeding is fixed, so the same `n` always yields the same table.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution, Exp, Gamma, LogNormal, Normal};
use tracing::debug;

use super::error::ScorerError;
use crate::config::SynthesizerConfig;
use crate::types::{Feature, FeatureVector, TrainingRecord, TrainingTable, NUM_FEATURES};

/// Generates reproducible synthetic training tables.
#[derive(Debug, Clone)]
pub struct DatasetSynthesizer {
    seed: u64,
    noise_std: f64,
}

impl Default for DatasetSynthesizer {
    fn default() -> Self {
        Self::new(&SynthesizerConfig::default())
    }
}

impl DatasetSynthesizer {
    pub const fn new(config: &SynthesizerConfig) -> Self {
        Self {
            seed: config.seed,
            noise_std: config.noise_std,
        }
    }

    /// Generate `n` labelled rows.
    pub fn generate(&self, n: usize) -> Result<TrainingTable, ScorerError> {
        if n == 0 {
            return Err(ScorerError::Validation(vec![
                "n: row count must be positive".to_string(),
            ]));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(NUM_FEATURES);
        for feature in Feature::ALL {
            columns.push(sample_feature(feature, &mut rng, n)?);
        }

        let rows: Vec<FeatureVector> = (0..n)
            .map(|i| {
                let mut v = [0.0; NUM_FEATURES];
                for (j, col) in columns.iter().enumerate() {
                    v[j] = col[i];
                }
                FeatureVector::from_array(v)
            })
            .collect();

        let raw: Vec<f64> = rows.iter().map(raw_score).collect();
        let (lo, hi) = raw
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });
        let range = hi - lo;

        let noise = Normal::new(0.0, self.noise_std)
            .map_err(|e| ScorerError::validation(format!("noise_std: {e}")))?;

        let table: TrainingTable = rows
            .into_iter()
            .zip(raw)
            .map(|(features, r)| {
                // A single row (or identical rows) has no spread to normalize over
                let normalized = if range > 0.0 { (r - lo) / range } else { 0.5 };
                let noisy = normalized + noise.sample(&mut rng);
                TrainingRecord {
                    features,
                    investment_score: noisy.clamp(0.0, 1.0),
                }
            })
            .collect();

        debug!(rows = n, seed = self.seed, "Generated synthetic training table");
        Ok(table)
    }
}

/// Generate `n` rows with the default seed and noise level.
pub fn generate(n: usize) -> Result<TrainingTable, ScorerError> {
    DatasetSynthesizer::default().generate(n)
}

fn sample_feature(feature: Feature, rng: &mut StdRng, n: usize) -> Result<Vec<f64>, ScorerError> {
    let bad = |e: &dyn std::fmt::Display| {
        ScorerError::validation(format!("{feature}: invalid distribution parameters ({e})"))
    };

    let column = match feature {
        // Heavy right tail
        Feature::ReserveTonnes => draw(&LogNormal::new(8.0, 1.5).map_err(|e| bad(&e))?, rng, n),
        // Can be negative
        Feature::PriceTrend => draw(&Normal::new(0.02, 0.05).map_err(|e| bad(&e))?, rng, n),
        Feature::LogisticsScore => draw(&Beta::new(2.0, 2.0).map_err(|e| bad(&e))?, rng, n),
        Feature::GovernanceScore => draw(&Beta::new(2.0, 3.0).map_err(|e| bad(&e))?, rng, n),
        // Gamma(shape, scale)
        Feature::ExtractionCost => draw(&Gamma::new(2.0, 50.0).map_err(|e| bad(&e))?, rng, n),
        Feature::TransportCost => draw(&Gamma::new(1.5, 30.0).map_err(|e| bad(&e))?, rng, n),
        Feature::PoliticalRisk => draw(&Beta::new(3.0, 2.0).map_err(|e| bad(&e))?, rng, n),
        Feature::EnvironmentalScore => draw(&Beta::new(2.5, 2.5).map_err(|e| bad(&e))?, rng, n),
        // Mean distance 200 km
        Feature::ProximityToPorts => draw(&Exp::new(1.0 / 200.0).map_err(|e| bad(&e))?, rng, n),
        Feature::EnergyCostIndex => draw(&Gamma::new(2.0, 0.8).map_err(|e| bad(&e))?, rng, n),
        Feature::LocalRefiningCapacity => draw(&Beta::new(1.5, 3.0).map_err(|e| bad(&e))?, rng, n),
    };
    Ok(column)
}

fn draw<D: Distribution<f64>>(dist: &D, rng: &mut StdRng, n: usize) -> Vec<f64> {
    dist.sample_iter(rng).take(n).collect()
}

/// Unnormalized attractiveness of a site.
///
/// Higher reserves, price trend, logistics, governance, environmental score
/// and refining capacity raise it; political risk, costs and port distance
/// lower it. Energy cost does not enter the target.
pub fn raw_score(f: &FeatureVector) -> f64 {
    0.2 * (f.reserve_tonnes + 1.0).ln() / 10.0
        + 0.15 * f.price_trend * 10.0
        + 0.2 * f.logistics_score
        + 0.25 * f.governance_score
        + 0.1 * (1.0 - f.political_risk)
        + 0.1 * f.environmental_score
        - 0.05 * (f.extraction_cost + 1.0).ln() / 5.0
        - 0.03 * (f.transport_cost + 1.0).ln() / 5.0
        + 0.08 * f.local_refining_capacity
        - 0.02 * (f.proximity_to_ports + 1.0).ln() / 10.0
}
