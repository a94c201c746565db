use serde::Serialize;

use crate::model::NetworkMetricRecord;

use super::tier::RiskTier;

/// Headline counts for the active chain.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub high: usize,
    pub warn: usize,
    pub anomaly: usize,
    /// Percent of `total`, 0 when empty.
    pub high_share: f64,
    /// Percent of `total`, 0 when empty.
    pub anomaly_share: f64,
    pub avg_density: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BucketKind {
    High,
    Warn,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionBucket {
    pub kind: BucketKind,
    pub label: &'static str,
    pub value: usize,
}

/// One row of the merged transaction feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub tx: String,
    pub ts: i64,
    pub time: String,
    pub amount: Option<f64>,
    pub token: String,
    pub contract: String,
    pub chain: String,
    pub risk: RiskTier,
}

/// Everything the token dashboard renders for one input snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DashboardView {
    pub filtered: Vec<NetworkMetricRecord>,
    pub summary: Summary,
    pub distribution: Vec<DistributionBucket>,
    pub leaders: Vec<NetworkMetricRecord>,
    pub feed: Vec<FeedEntry>,
}
