use serde::{Deserialize, Serialize};

use crate::aggregate::{DashboardView, RiskTier, RuleTotals};
use crate::graph::{BuildReport, GraphScene};
use crate::loader::{Batch, LoadError, LoadState};
use crate::model::{AddressDetailRecord, AlertRecord, RuleEvaluationRecord};
use crate::panels::PanelView;

// ============================================================
// Query params
// ============================================================

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    pub chain: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GraphParams {
    pub chain: Option<String>,
    /// Applied to the camera after the graph is built.
    pub zoom: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlertParams {
    pub path: Option<String>,
    pub limit: Option<usize>,
    /// Derive alerts from the rule-evaluation feed instead of the alerts feed.
    #[serde(default)]
    pub from_rules: bool,
}

// ============================================================
// Responses
// ============================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub chains: usize,
    pub live_graphs: usize,
}

#[derive(Debug, Serialize)]
pub struct ChainsResponse {
    pub chains: Vec<String>,
    pub active: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub chain: String,
    pub query: String,
    pub sort: String,
    #[serde(flatten)]
    pub view: DashboardView,
}

#[derive(Debug, Serialize)]
pub struct TokenGraphResponse {
    pub chain: String,
    pub contract: String,
    pub name: String,
    /// `None` when the token carries no graph; the mount is left empty.
    pub scene: Option<GraphScene>,
    pub report: Option<BuildReport>,
}

#[derive(Debug, Serialize)]
pub struct LoadErrorBody {
    pub kind: &'static str,
    pub message: String,
}

impl From<&LoadError> for LoadErrorBody {
    fn from(err: &LoadError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// A feed's loader state, its payload when ready, and the rendered panel.
#[derive(Debug, Serialize)]
pub struct FeedResponse<T> {
    pub locator: String,
    pub status: &'static str,
    pub error: Option<LoadErrorBody>,
    pub dropped: usize,
    pub data: Option<T>,
    pub panel: PanelView,
}

impl<T> FeedResponse<T> {
    pub fn from_state<D>(
        locator: impl Into<String>,
        state: &LoadState<D>,
        dropped: impl FnOnce(&D) -> usize,
        data: impl FnOnce(&D) -> T,
        panel: PanelView,
    ) -> Self {
        Self {
            locator: locator.into(),
            status: state.label(),
            error: state.error().map(LoadErrorBody::from),
            dropped: state.data().map(dropped).unwrap_or(0),
            data: state.data().map(data),
            panel,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RulesPayload {
    pub totals: RuleTotals,
    pub records: Vec<RuleEvaluationRecord>,
}

impl From<&Batch<RuleEvaluationRecord>> for RulesPayload {
    fn from(batch: &Batch<RuleEvaluationRecord>) -> Self {
        Self {
            totals: crate::aggregate::rule_totals(&batch.records),
            records: batch.records.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AlertView {
    #[serde(flatten)]
    pub alert: AlertRecord,
    pub tier: RiskTier,
}

#[derive(Debug, Serialize)]
pub struct DetailPayload {
    #[serde(flatten)]
    pub detail: AddressDetailRecord,
    pub badges: Vec<String>,
}

impl From<&AddressDetailRecord> for DetailPayload {
    fn from(detail: &AddressDetailRecord) -> Self {
        Self {
            detail: detail.clone(),
            badges: crate::aggregate::evidence_badges(&detail.evidence),
        }
    }
}
