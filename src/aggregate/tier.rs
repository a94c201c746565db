use serde::{Deserialize, Serialize};

use crate::model::AlertRecord;

/// Lower edge of the HIGH band (inclusive).
pub const HIGH_THRESHOLD: f64 = 7.5;
/// Lower edge of the MED band (inclusive).
pub const MED_THRESHOLD: f64 = 4.5;

/// Anomaly scores at or above this count as anomalous in summaries.
pub const ANOMALY_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    High,
    Med,
    Low,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Med => "MED",
            Self::Low => "LOW",
        }
    }
}

/// Map a continuous risk score onto a tier. NaN falls through to LOW.
pub fn classify_tier(risk_score: f64) -> RiskTier {
    if risk_score >= HIGH_THRESHOLD {
        RiskTier::High
    } else if risk_score >= MED_THRESHOLD {
        RiskTier::Med
    } else {
        RiskTier::Low
    }
}

impl AlertRecord {
    pub fn tier(&self) -> RiskTier {
        classify_tier(self.score)
    }
}
