//! Labelled training data: feature vectors paired with a known or synthetic
//! investment score.

use serde::{Deserialize, Serialize};

use super::features::{FeatureVector, NUM_FEATURES};

/// A feature vector plus its target investment score in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    #[serde(flatten)]
    pub features: FeatureVector,
    /// Target attractiveness score
    pub investment_score: f64,
}

/// Ordered collection of training records.
///
/// Row order carries no meaning but is what the reproducible train/test
/// partition indexes into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingTable {
    records: Vec<TrainingRecord>,
}

impl TrainingTable {
    pub const fn new(records: Vec<TrainingRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TrainingRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [TrainingRecord] {
        &mut self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrainingRecord> {
        self.records.iter()
    }

    /// Raw feature rows for the given row indices.
    pub fn feature_rows(&self, indices: &[usize]) -> Vec<[f64; NUM_FEATURES]> {
        indices
            .iter()
            .map(|&i| self.records[i].features.to_array())
            .collect()
    }

    /// Targets for the given row indices.
    pub fn targets(&self, indices: &[usize]) -> Vec<f64> {
        indices
            .iter()
            .map(|&i| self.records[i].investment_score)
            .collect()
    }

    /// Describe every unusable cell as `row {i}: {field}`: non-finite
    /// features, and targets that are non-finite or outside [0,1].
    pub fn invalid_cells(&self) -> Vec<String> {
        let mut bad = Vec::new();
        for (i, r) in self.records.iter().enumerate() {
            for name in r.features.non_finite_features() {
                bad.push(format!("row {i}: {name}"));
            }
            if !(0.0..=1.0).contains(&r.investment_score) {
                bad.push(format!("row {i}: investment_score"));
            }
        }
        bad
    }
}

impl FromIterator<TrainingRecord> for TrainingTable {
    fn from_iter<I: IntoIterator<Item = TrainingRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TrainingTable {
    type Item = &'a TrainingRecord;
    type IntoIter = std::slice::Iter<'a, TrainingRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
