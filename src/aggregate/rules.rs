use std::collections::HashMap;

use serde::Serialize;

use crate::model::{AlertRecord, Evidence, RuleEvaluationRecord};

/// Column sums shown above the rule-evaluation table.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RuleTotals {
    pub total: f64,
    #[serde(rename = "C")]
    pub c: f64,
    #[serde(rename = "E")]
    pub e: f64,
    #[serde(rename = "B")]
    pub b: f64,
}

impl RuleTotals {
    fn add(&mut self, record: &RuleEvaluationRecord) {
        self.total += record.total_risk_score.unwrap_or(0.0);
        self.c += record.compliance_score.unwrap_or(0.0);
        self.e += record.exposure_score.unwrap_or(0.0);
        self.b += record.behavior_score.unwrap_or(0.0);
    }
}

/// Sum each score column; absent values count as 0. Each column is summed
/// independently, so `total` need not equal `C + E + B`.
pub fn rule_totals(records: &[RuleEvaluationRecord]) -> RuleTotals {
    let mut totals = RuleTotals::default();
    for record in records {
        totals.add(record);
    }
    totals
}

/// Roll rule evaluations up to per-address alerts, highest summed score
/// first, keeping at most `k`. Records without an address are skipped.
pub fn alerts_from_rules(records: &[RuleEvaluationRecord], k: usize) -> Vec<AlertRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut by_address: HashMap<String, RuleTotals> = HashMap::new();

    for record in records {
        let Some(address) = record.address.as_deref().map(str::to_lowercase) else {
            continue;
        };
        if address.is_empty() {
            continue;
        }
        by_address
            .entry(address.clone())
            .or_insert_with(|| {
                order.push(address);
                RuleTotals::default()
            })
            .add(record);
    }

    let mut alerts: Vec<AlertRecord> = order
        .into_iter()
        .filter_map(|address| {
            let totals = by_address.get(&address)?;
            Some(AlertRecord {
                address,
                score: totals.total,
                c: totals.c,
                e: totals.e,
                b: totals.b,
            })
        })
        .collect();

    alerts.sort_by(|a, b| b.score.total_cmp(&a.score));
    alerts.truncate(k);
    alerts
}

/// Keep feed order, cut to the display limit.
pub fn top_alerts(alerts: &[AlertRecord], limit: usize) -> Vec<AlertRecord> {
    alerts.iter().take(limit).cloned().collect()
}

/// Badge labels for the evidence flags that are set, in display order.
pub fn evidence_badges(evidence: &Evidence) -> Vec<String> {
    let mut badges = Vec::new();
    if evidence.sdn {
        badges.push("SDN".to_string());
    }
    if let Some(hop) = evidence.hop {
        badges.push(format!("HOP≤{}", hop));
    }
    if evidence.mixer {
        badges.push("MIXER".to_string());
    }
    if evidence.cex_internal {
        badges.push("CEX_INTERNAL".to_string());
    }
    badges
}
