use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use super::Record;

/// Rule-engine output for one transaction or address.
///
/// `total_risk_score` is supplied by the rule engine and is never derived
/// from the C/E/B triad here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluationRecord {
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub rules_triggered: Vec<String>,
    #[serde(default)]
    pub compliance_score: Option<f64>,
    #[serde(default)]
    pub exposure_score: Option<f64>,
    #[serde(default)]
    pub behavior_score: Option<f64>,
    #[serde(default)]
    pub total_risk_score: Option<f64>,
}

impl Record for RuleEvaluationRecord {
    const KIND: &'static str = "rule_evaluation";

    fn check(&self) -> Result<(), String> {
        if self.tx_hash.is_none() && self.address.is_none() {
            return Err("record has neither tx_hash nor address".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub address: String,
    pub score: f64,
    #[serde(rename = "C")]
    pub c: f64,
    #[serde(rename = "E")]
    pub e: f64,
    #[serde(rename = "B")]
    pub b: f64,
}

impl Record for AlertRecord {
    const KIND: &'static str = "alert";

    fn check(&self) -> Result<(), String> {
        if self.address.is_empty() {
            return Err("alert without address".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(rename = "C", default)]
    pub c: Option<f64>,
    #[serde(rename = "E", default)]
    pub e: Option<f64>,
    #[serde(rename = "B", default)]
    pub b: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default)]
    pub sdn: bool,
    #[serde(default)]
    pub hop: Option<u32>,
    #[serde(default)]
    pub mixer: bool,
    #[serde(default)]
    pub cex_internal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleHit {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub severity: Severity,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentTx {
    pub tx_hash: String,
    pub ts: i64,
    #[serde(default)]
    pub usd_value: Option<f64>,
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub rules: Vec<String>,
}

/// Full rule breakdown for one address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressDetailRecord {
    pub address: String,
    #[serde(default)]
    pub chain: String,
    #[serde(default)]
    pub analyzed_at: String,
    #[serde(default)]
    pub scores: ScoreBreakdown,
    #[serde(default)]
    pub evidence: Evidence,
    #[serde(default, deserialize_with = "lenient_rules")]
    pub rules: Vec<RuleHit>,
    #[serde(default)]
    pub tx_recent: Vec<RecentTx>,
}

/// Rule entries with an unknown severity or missing id are dropped
/// individually instead of failing the whole document.
fn lenient_rules<'de, D>(deserializer: D) -> Result<Vec<RuleHit>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<JsonValue> = Vec::deserialize(deserializer)?;
    let total = raw.len();
    let rules: Vec<RuleHit> = raw
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    if rules.len() < total {
        tracing::warn!(
            dropped = total - rules.len(),
            "Dropped malformed rule entries from address detail"
        );
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_keeps_valid_rules_only() {
        let json = r#"{
            "address": "0x1111111111111111111111111111111111111111",
            "chain": "ethereum",
            "analyzed_at": "2025-01-01T00:00:00Z",
            "scores": {"total": 72.5, "C": 30, "E": 30, "B": 12.5},
            "evidence": {"sdn": true, "hop": 2, "mixer": false},
            "rules": [
                {"id": "C-001", "name": "SDN match", "severity": "HIGH", "score": 30},
                {"id": "X-999", "name": "bogus", "severity": "CRITICAL"}
            ],
            "tx_recent": [
                {"tx_hash": "0xaa", "ts": 1712345678, "usd_value": 1200.5, "dir": "in",
                 "rules": ["C-001"]}
            ]
        }"#;
        let detail: AddressDetailRecord = serde_json::from_str(json).unwrap();
        assert_eq!(detail.rules.len(), 1);
        assert_eq!(detail.rules[0].severity, Severity::High);
        assert_eq!(detail.evidence.hop, Some(2));
        assert!(!detail.evidence.cex_internal);
        // total is carried as supplied, not recomputed from C+E+B
        assert_eq!(detail.scores.total, Some(72.5));
    }

    #[test]
    fn test_alert_field_names() {
        let alert: AlertRecord =
            serde_json::from_str(r#"{"address":"0x1","score":9.1,"C":3,"E":4,"B":2.1}"#).unwrap();
        assert_eq!(alert.c, 3.0);
        assert_eq!(alert.b, 2.1);
    }
}
