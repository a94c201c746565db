use serde::Serialize;

use crate::aggregate::engine::format_ts;
use crate::aggregate::{evidence_badges, rule_totals, top_alerts};
use crate::loader::{Batch, LoadState};
use crate::model::{AddressDetailRecord, AlertRecord, RuleEvaluationRecord};

pub const ALERTS_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelStatus {
    Loading,
    Error,
    Empty,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelStat {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelRow {
    pub key: String,
    pub cells: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<String>,
}

/// Display-ready content of one panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub title: String,
    pub status: PanelStatus,
    pub message: Option<String>,
    pub stats: Vec<PanelStat>,
    pub badges: Vec<String>,
    pub rows: Vec<PanelRow>,
}

impl PanelView {
    fn new(title: impl Into<String>, status: PanelStatus) -> Self {
        Self {
            title: title.into(),
            status,
            message: None,
            stats: Vec::new(),
            badges: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Loading and error views shared by every built-in panel.
    fn pending<T>(title: &str, state: &LoadState<T>) -> Option<Self> {
        match state {
            LoadState::Loading => {
                Some(Self::new(title, PanelStatus::Loading).with_message("Loading…"))
            }
            LoadState::Failed(err) => {
                Some(Self::new(title, PanelStatus::Error).with_message(format!("Error: {}", err)))
            }
            LoadState::Ready(_) => None,
        }
    }
}

/// Turns the state of one feed into a panel.
pub trait PanelRenderer<T>: Send + Sync {
    fn render(&self, state: &LoadState<T>) -> PanelView;
}

/// One decimal place, `-` for missing or non-finite values.
pub fn fmt_score(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.1}", v),
        _ => "-".to_string(),
    }
}

// ============================================================
// Built-in renderers
// ============================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct RulesPanel;

impl PanelRenderer<Batch<RuleEvaluationRecord>> for RulesPanel {
    fn render(&self, state: &LoadState<Batch<RuleEvaluationRecord>>) -> PanelView {
        const TITLE: &str = "Address Risk (Rule-based)";
        if let Some(view) = PanelView::pending(TITLE, state) {
            return view;
        }
        let records = state.data().map(|b| b.records.as_slice()).unwrap_or_default();
        if records.is_empty() {
            return PanelView::new(TITLE, PanelStatus::Empty).with_message("No results.");
        }

        let totals = rule_totals(records);
        let mut view = PanelView::new(TITLE, PanelStatus::Ready);
        view.stats = vec![
            PanelStat {
                label: "Total",
                value: fmt_score(Some(totals.total)),
            },
            PanelStat {
                label: "Compliance (C)",
                value: fmt_score(Some(totals.c)),
            },
            PanelStat {
                label: "Exposure (E)",
                value: fmt_score(Some(totals.e)),
            },
            PanelStat {
                label: "Behavior (B)",
                value: fmt_score(Some(totals.b)),
            },
        ];
        view.rows = records
            .iter()
            .enumerate()
            .map(|(idx, r)| {
                let tx = r.tx_hash.clone().unwrap_or_else(|| "-".to_string());
                PanelRow {
                    key: r.tx_hash.clone().unwrap_or_else(|| idx.to_string()),
                    cells: vec![
                        tx,
                        fmt_score(r.total_risk_score),
                        fmt_score(r.compliance_score),
                        fmt_score(r.exposure_score),
                        fmt_score(r.behavior_score),
                    ],
                    badges: r.rules_triggered.clone(),
                }
            })
            .collect();
        view
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlertsPanel {
    pub limit: usize,
}

impl Default for AlertsPanel {
    fn default() -> Self {
        Self { limit: ALERTS_LIMIT }
    }
}

impl PanelRenderer<Batch<AlertRecord>> for AlertsPanel {
    fn render(&self, state: &LoadState<Batch<AlertRecord>>) -> PanelView {
        const TITLE: &str = "오늘 감지된 위험 주소";
        if let Some(view) = PanelView::pending(TITLE, state) {
            return view;
        }
        let alerts = state.data().map(|b| b.records.as_slice()).unwrap_or_default();
        let shown = top_alerts(alerts, self.limit);
        if shown.is_empty() {
            return PanelView::new(TITLE, PanelStatus::Empty).with_message("No results.");
        }

        let mut view = PanelView::new(TITLE, PanelStatus::Ready);
        view.rows = shown
            .iter()
            .enumerate()
            .map(|(idx, alert)| PanelRow {
                key: alert.address.clone(),
                cells: vec![
                    (idx + 1).to_string(),
                    alert.address.clone(),
                    format!("C:{:.1} E:{:.1} B:{:.1}", alert.c, alert.e, alert.b),
                    format!("Risk {:.1}", alert.score),
                ],
                badges: vec![alert.tier().as_str().to_string()],
            })
            .collect();
        view
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DetailPanel;

impl PanelRenderer<AddressDetailRecord> for DetailPanel {
    fn render(&self, state: &LoadState<AddressDetailRecord>) -> PanelView {
        const TITLE: &str = "Address Detail";
        if let Some(view) = PanelView::pending(TITLE, state) {
            return view;
        }
        let Some(detail) = state.data() else {
            return PanelView::new(TITLE, PanelStatus::Empty).with_message("No data.");
        };

        let mut view = PanelView::new(TITLE, PanelStatus::Ready).with_message(format!(
            "{} · {} · {}",
            detail.address, detail.chain, detail.analyzed_at
        ));
        view.stats = vec![
            PanelStat {
                label: "Risk (Total)",
                value: fmt_score(detail.scores.total),
            },
            PanelStat {
                label: "Compliance (C)",
                value: fmt_score(detail.scores.c),
            },
            PanelStat {
                label: "Exposure (E)",
                value: fmt_score(detail.scores.e),
            },
            PanelStat {
                label: "Behavior (B)",
                value: fmt_score(detail.scores.b),
            },
        ];
        view.badges = evidence_badges(&detail.evidence);

        view.rows.extend(detail.rules.iter().map(|rule| PanelRow {
            key: format!("rule:{}", rule.id),
            cells: vec![
                rule.id.clone(),
                rule.name.clone(),
                rule.severity.as_str().to_string(),
                fmt_score(rule.score),
            ],
            badges: Vec::new(),
        }));
        view.rows.extend(detail.tx_recent.iter().map(|tx| PanelRow {
            key: format!("tx:{}", tx.tx_hash),
            cells: vec![
                tx.tx_hash.clone(),
                format_ts(tx.ts),
                tx.dir.clone().unwrap_or_else(|| "-".to_string()),
                format!("{:.2}", tx.usd_value.unwrap_or(0.0)),
            ],
            badges: tx.rules.clone(),
        }));
        view
    }
}

// ============================================================
// Capability set
// ============================================================

/// Optional renderers supplied at construction. Anything left unset is
/// drawn by the matching built-in panel.
#[derive(Default)]
pub struct Panels {
    pub rules: Option<Box<dyn PanelRenderer<Batch<RuleEvaluationRecord>>>>,
    pub alerts: Option<Box<dyn PanelRenderer<Batch<AlertRecord>>>>,
    pub detail: Option<Box<dyn PanelRenderer<AddressDetailRecord>>>,
    alerts_limit: Option<usize>,
}

impl Panels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row limit for the built-in alerts panel.
    pub fn with_alerts_limit(mut self, limit: usize) -> Self {
        self.alerts_limit = Some(limit);
        self
    }

    pub fn render_rules(&self, state: &LoadState<Batch<RuleEvaluationRecord>>) -> PanelView {
        match &self.rules {
            Some(renderer) => renderer.render(state),
            None => RulesPanel.render(state),
        }
    }

    pub fn render_alerts(&self, state: &LoadState<Batch<AlertRecord>>) -> PanelView {
        self.render_alerts_limited(state, self.alerts_limit.unwrap_or(ALERTS_LIMIT))
    }

    /// Like `render_alerts`, but the built-in panel shows up to `limit` rows
    /// instead of the configured count.
    pub fn render_alerts_limited(
        &self,
        state: &LoadState<Batch<AlertRecord>>,
        limit: usize,
    ) -> PanelView {
        match &self.alerts {
            Some(renderer) => renderer.render(state),
            None => AlertsPanel { limit }.render(state),
        }
    }

    pub fn render_detail(&self, state: &LoadState<AddressDetailRecord>) -> PanelView {
        match &self.detail {
            Some(renderer) => renderer.render(state),
            None => DetailPanel.render(state),
        }
    }
}
