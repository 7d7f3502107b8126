//! Site feature definitions: the 11 numeric attributes a mineral site is
//! scored on, and the fixed order they are fed to the scaler and forest.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::config::validation::suggest_correction;

/// Number of model input features.
pub const NUM_FEATURES: usize = 11;

/// Feature names in model input order.
///
/// This order is shared by training, inference and the persisted bundle.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "reserve_tonnes",
    "price_trend",
    "logistics_score",
    "governance_score",
    "extraction_cost",
    "transport_cost",
    "political_risk",
    "environmental_score",
    "proximity_to_ports",
    "energy_cost_index",
    "local_refining_capacity",
];

/// One site attribute, indexable into [`FEATURE_NAMES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    ReserveTonnes,
    PriceTrend,
    LogisticsScore,
    GovernanceScore,
    ExtractionCost,
    TransportCost,
    PoliticalRisk,
    EnvironmentalScore,
    ProximityToPorts,
    EnergyCostIndex,
    LocalRefiningCapacity,
}

impl Feature {
    /// All features in model input order.
    pub const ALL: [Self; NUM_FEATURES] = [
        Self::ReserveTonnes,
        Self::PriceTrend,
        Self::LogisticsScore,
        Self::GovernanceScore,
        Self::ExtractionCost,
        Self::TransportCost,
        Self::PoliticalRisk,
        Self::EnvironmentalScore,
        Self::ProximityToPorts,
        Self::EnergyCostIndex,
        Self::LocalRefiningCapacity,
    ];

    /// Position in the model input vector.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        FEATURE_NAMES[self as usize]
    }

    /// Look up a feature by its snake_case name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw (unscaled) measurements describing one mineral site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Estimated reserve size (tonnes)
    pub reserve_tonnes: f64,
    /// Commodity price trend (fractional change, may be negative)
    pub price_trend: f64,
    /// Logistics performance score (0-1)
    pub logistics_score: f64,
    /// Governance quality score (0-1)
    pub governance_score: f64,
    /// Extraction cost per tonne
    pub extraction_cost: f64,
    /// Transport cost per tonne
    pub transport_cost: f64,
    /// Political risk (0-1, higher is riskier)
    pub political_risk: f64,
    /// Environmental compliance score (0-1)
    pub environmental_score: f64,
    /// Distance to the nearest export port (km)
    pub proximity_to_ports: f64,
    /// Energy cost multiplier
    pub energy_cost_index: f64,
    /// Local processing capability (0-1)
    pub local_refining_capacity: f64,
}

impl FeatureVector {
    /// Build from values already in [`FEATURE_NAMES`] order.
    pub const fn from_array(v: [f64; NUM_FEATURES]) -> Self {
        Self {
            reserve_tonnes: v[0],
            price_trend: v[1],
            logistics_score: v[2],
            governance_score: v[3],
            extraction_cost: v[4],
            transport_cost: v[5],
            political_risk: v[6],
            environmental_score: v[7],
            proximity_to_ports: v[8],
            energy_cost_index: v[9],
            local_refining_capacity: v[10],
        }
    }

    /// Values in [`FEATURE_NAMES`] order.
    pub const fn to_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.reserve_tonnes,
            self.price_trend,
            self.logistics_score,
            self.governance_score,
            self.extraction_cost,
            self.transport_cost,
            self.political_risk,
            self.environmental_score,
            self.proximity_to_ports,
            self.energy_cost_index,
            self.local_refining_capacity,
        ]
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.to_array()[feature.index()]
    }

    /// Build from a name-keyed map.
    ///
    /// Every required name must be present; the error lists all missing names
    /// in feature order. Unknown keys are ignored with a warning.
    pub fn from_map(values: &HashMap<String, f64>) -> Result<Self, Vec<String>> {
        let missing: Vec<String> = FEATURE_NAMES
            .iter()
            .filter(|name| !values.contains_key(**name))
            .map(|name| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        let known: HashSet<&str> = FEATURE_NAMES.iter().copied().collect();
        for key in values.keys().filter(|k| !known.contains(k.as_str())) {
            match suggest_correction(key, &known) {
                Some(s) => warn!(key = %key, suggestion = %s, "Ignoring unknown feature key"),
                None => warn!(key = %key, "Ignoring unknown feature key"),
            }
        }

        let mut v = [0.0; NUM_FEATURES];
        for (slot, name) in v.iter_mut().zip(FEATURE_NAMES.iter()) {
            if let Some(&x) = values.get(*name) {
                *slot = x;
            }
        }
        Ok(Self::from_array(v))
    }

    /// Names of features whose value is NaN or infinite.
    pub fn non_finite_features(&self) -> Vec<String> {
        self.to_array()
            .iter()
            .zip(FEATURE_NAMES.iter())
            .filter(|(x, _)| !x.is_finite())
            .map(|(_, name)| (*name).to_string())
            .collect()
    }
}

impl From<FeatureVector> for HashMap<String, f64> {
    fn from(v: FeatureVector) -> Self {
        FEATURE_NAMES
            .iter()
            .zip(v.to_array())
            .map(|(name, x)| ((*name).to_string(), x))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_map() -> HashMap<String, f64> {
        [
            ("reserve_tonnes", 5000.0),
            ("price_trend", 0.08),
            ("logistics_score", 0.7),
            ("governance_score", 0.6),
            ("extraction_cost", 80.0),
            ("transport_cost", 45.0),
            ("political_risk", 0.3),
            ("environmental_score", 0.8),
            ("proximity_to_ports", 150.0),
            ("energy_cost_index", 1.2),
            ("local_refining_capacity", 0.4),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn test_feature_order_matches_names() {
        for (i, f) in Feature::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
            assert_eq!(f.name(), FEATURE_NAMES[i]);
            assert_eq!(Feature::from_name(f.name()), Some(*f));
        }
    }

    #[test]
    fn test_from_map_orders_values() {
        let v = FeatureVector::from_map(&example_map()).expect("complete map");
        assert_eq!(v.reserve_tonnes, 5000.0);
        assert_eq!(v.get(Feature::ProximityToPorts), 150.0);
        assert_eq!(v.to_array()[10], 0.4);
    }

    #[test]
    fn test_from_map_reports_all_missing() {
        let mut map = example_map();
        map.remove("governance_score");
        map.remove("transport_cost");
        let missing = FeatureVector::from_map(&map).expect_err("should fail");
        assert_eq!(missing, vec!["governance_score", "transport_cost"]);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let mut map = example_map();
        map.insert("country_index".to_string(), 12.0);
        let v = FeatureVector::from_map(&map).expect("extra keys are fine");
        assert_eq!(v.political_risk, 0.3);
    }

    #[test]
    fn test_map_round_trip() {
        let v = FeatureVector::from_map(&example_map()).expect("complete map");
        let back: HashMap<String, f64> = v.into();
        assert_eq!(back, example_map());
    }

    #[test]
    fn test_non_finite_features() {
        let mut v = FeatureVector::from_map(&example_map()).expect("complete map");
        v.price_trend = f64::NAN;
        v.extraction_cost = f64::INFINITY;
        assert_eq!(v.non_finite_features(), vec!["price_trend", "extraction_cost"]);
    }
}
