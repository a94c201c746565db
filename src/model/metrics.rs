use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::graph::GraphModel;
use super::Record;

/// Network-graph metrics for one monitored token contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMetricRecord {
    pub chain: String,
    pub contract: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: u64,
    #[serde(default)]
    pub edges: u64,
    #[serde(default)]
    pub density: Option<f64>,
    #[serde(default)]
    pub assortativity: Option<f64>,
    #[serde(default)]
    pub reciprocity: Option<f64>,
    #[serde(default)]
    pub clustering: Option<f64>,
    #[serde(default)]
    pub eff_diameter: Option<u32>,
    pub risk_score: f64,
    pub anomaly_score: f64,
    /// Detection rationale, in display priority order.
    #[serde(default)]
    pub reasons: Vec<Reason>,
    /// Similar tokens in caller order; not assumed sorted.
    #[serde(default)]
    pub neighbors: Vec<Neighbor>,
    #[serde(default)]
    pub samples: Vec<TxSample>,
    #[serde(default)]
    pub graph: Option<GraphModel>,
}

impl Record for NetworkMetricRecord {
    const KIND: &'static str = "network_metric";

    fn check(&self) -> Result<(), String> {
        if self.contract.is_empty() {
            return Err("contract must not be empty".to_string());
        }
        if !self.risk_score.is_finite() || !self.anomaly_score.is_finite() {
            return Err(format!("non-finite score on {}", self.contract));
        }
        Ok(())
    }
}

impl NetworkMetricRecord {
    /// Numeric value of the field named by `key`. Absent fields read as 0.
    pub fn metric(&self, key: SortKey) -> f64 {
        match key {
            SortKey::RiskScore => self.risk_score,
            SortKey::AnomalyScore => self.anomaly_score,
            SortKey::Nodes => self.nodes as f64,
            SortKey::Edges => self.edges as f64,
            SortKey::Density => self.density.unwrap_or(0.0),
            SortKey::Assortativity => self.assortativity.unwrap_or(0.0),
            SortKey::Reciprocity => self.reciprocity.unwrap_or(0.0),
            SortKey::Clustering => self.clustering.unwrap_or(0.0),
            SortKey::EffDiameter => self.eff_diameter.map(f64::from).unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub token: String,
    pub jaccard: f64,
}

/// A sampled transaction. `ts` is unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxSample {
    pub tx: String,
    pub ts: i64,
    #[serde(default)]
    pub amt: Option<f64>,
}

/// Numeric fields a token table can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    RiskScore,
    AnomalyScore,
    Nodes,
    Edges,
    Density,
    Assortativity,
    Reciprocity,
    Clustering,
    EffDiameter,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RiskScore => "riskScore",
            Self::AnomalyScore => "anomalyScore",
            Self::Nodes => "nodes",
            Self::Edges => "edges",
            Self::Density => "density",
            Self::Assortativity => "assortativity",
            Self::Reciprocity => "reciprocity",
            Self::Clustering => "clustering",
            Self::EffDiameter => "effDiameter",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "riskScore" => Ok(Self::RiskScore),
            "anomalyScore" => Ok(Self::AnomalyScore),
            "nodes" => Ok(Self::Nodes),
            "edges" => Ok(Self::Edges),
            "density" => Ok(Self::Density),
            "assortativity" => Ok(Self::Assortativity),
            "reciprocity" => Ok(Self::Reciprocity),
            "clustering" => Ok(Self::Clustering),
            "effDiameter" => Ok(Self::EffDiameter),
            other => Err(format!("unknown sort key '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_camel_case_record() {
        let json = r#"{
            "chain": "ethereum",
            "contract": "0x1154...220f",
            "name": "ETH-Rapid",
            "nodes": 3164,
            "edges": 8149,
            "density": 0.01943,
            "effDiameter": 20,
            "riskScore": 8.1,
            "anomalyScore": 0.71,
            "reasons": [{"key": "fanout_spike", "label": "fanout spike"}],
            "samples": [{"tx": "0xabc1", "ts": 1712345678, "amt": 93210.4}]
        }"#;
        let record: NetworkMetricRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.eff_diameter, Some(20));
        assert_eq!(record.reasons[0].key, "fanout_spike");
        assert!(record.neighbors.is_empty());
        assert!(record.graph.is_none());
        assert_eq!(record.metric(SortKey::Clustering), 0.0);
        assert_eq!(record.metric(SortKey::EffDiameter), 20.0);
    }

    #[test]
    fn test_sort_key_round_trips_through_str() {
        for key in [SortKey::RiskScore, SortKey::EffDiameter, SortKey::Density] {
            assert_eq!(key.as_str().parse::<SortKey>().unwrap(), key);
        }
        assert!("volume".parse::<SortKey>().is_err());
    }
}
