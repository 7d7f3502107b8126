//! Post-processing of a score into the rating and recommendation a serving
//! layer returns to clients. Pure functions over the [0,1] score.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Feature, NUM_FEATURES};

/// Score at or above which investment is recommended.
pub const PROCEED_THRESHOLD: f64 = 0.5;

/// Features that drive downside risk, reported with every assessment.
pub const RISK_FACTORS: [Feature; 3] = [
    Feature::PoliticalRisk,
    Feature::ExtractionCost,
    Feature::TransportCost,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvestmentRating {
    #[serde(rename = "Highly Attractive")]
    HighlyAttractive,
    Attractive,
    Moderate,
    #[serde(rename = "Low Potential")]
    LowPotential,
    #[serde(rename = "Not Recommended")]
    NotRecommended,
}

impl InvestmentRating {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Self::HighlyAttractive
        } else if score >= 0.6 {
            Self::Attractive
        } else if score >= 0.4 {
            Self::Moderate
        } else if score >= 0.2 {
            Self::LowPotential
        } else {
            Self::NotRecommended
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::HighlyAttractive => "Highly Attractive",
            Self::Attractive => "Attractive",
            Self::Moderate => "Moderate",
            Self::LowPotential => "Low Potential",
            Self::NotRecommended => "Not Recommended",
        }
    }
}

impl std::fmt::Display for InvestmentRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Scores near the extremes are where the synthetic target is clipped, so
/// they are reported with lower confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
}

impl Confidence {
    pub fn from_score(score: f64) -> Self {
        if (0.2..=0.8).contains(&score) {
            Self::High
        } else {
            Self::Medium
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub proceed: bool,
    /// Most important features according to the fitted model
    pub key_factors: Vec<String>,
    pub risk_factors: Vec<String>,
}

/// Classified result for one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Score rounded to three decimals
    pub investment_score: f64,
    pub rating: InvestmentRating,
    pub confidence: Confidence,
    pub features_analyzed: usize,
    pub generated_at: DateTime<Utc>,
    pub recommendation: Recommendation,
}

impl Assessment {
    /// Classification uses the unrounded score.
    pub fn from_score(score: f64, key_factors: Vec<String>) -> Self {
        Self {
            investment_score: (score * 1000.0).round() / 1000.0,
            rating: InvestmentRating::from_score(score),
            confidence: Confidence::from_score(score),
            features_analyzed: NUM_FEATURES,
            generated_at: Utc::now(),
            recommendation: Recommendation {
                proceed: score >= PROCEED_THRESHOLD,
                key_factors,
                risk_factors: RISK_FACTORS.iter().map(|f| f.name().to_string()).collect(),
            },
        }
    }
}
