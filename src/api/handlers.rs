use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::aggregate::top_alerts;
use crate::dashboard::validate_address;
use crate::loader::{Batch, LoadState};
use crate::model::SortKey;

use super::types::*;
use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn api_error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}

// ============================================================
// Health & Chains
// ============================================================

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    let dashboard = state.dashboard.lock().await;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chains: dashboard.chains().len(),
        live_graphs: dashboard.live_graphs(),
    }))
}

pub async fn chains(State(state): State<Arc<AppState>>) -> ApiResult<ChainsResponse> {
    let dashboard = state.dashboard.lock().await;
    Ok(Json(ChainsResponse {
        chains: dashboard.chains().to_vec(),
        active: dashboard.chain().to_string(),
    }))
}

// ============================================================
// Token dashboard
// ============================================================

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardParams>,
) -> ApiResult<DashboardResponse> {
    let sort_key = params
        .sort
        .as_deref()
        .map(str::parse::<SortKey>)
        .transpose()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    let mut dashboard = state.dashboard.lock().await;
    if let Some(chain) = params.chain.as_deref() {
        if chain != dashboard.chain() {
            dashboard.select_chain(chain);
        }
    }
    if let Some(q) = params.q.as_deref() {
        dashboard.set_query(q);
    }
    if let Some(sort_key) = sort_key {
        dashboard.set_sort(sort_key);
    }

    Ok(Json(DashboardResponse {
        chain: dashboard.chain().to_string(),
        query: dashboard.query().to_string(),
        sort: dashboard.sort_key().to_string(),
        view: (*dashboard.view()).clone(),
    }))
}

pub async fn token_graph(
    State(state): State<Arc<AppState>>,
    Path(contract): Path<String>,
    Query(params): Query<GraphParams>,
) -> ApiResult<TokenGraphResponse> {
    let mut dashboard = state.dashboard.lock().await;
    if let Some(chain) = params.chain.as_deref() {
        if chain != dashboard.chain() {
            dashboard.select_chain(chain);
        }
    }

    let scene = dashboard
        .select_entity(&contract)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let Some(name) = dashboard.selected().map(|r| r.name.clone()) else {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Token {} not found on {}", contract, dashboard.chain()),
        ));
    };

    let scene = match (scene, params.zoom) {
        (Some(_), Some(factor)) => {
            dashboard.zoom(factor);
            dashboard.scene()
        }
        (scene, _) => scene,
    };

    Ok(Json(TokenGraphResponse {
        chain: dashboard.chain().to_string(),
        contract,
        name,
        scene,
        report: dashboard.graph_report(),
    }))
}

// ============================================================
// Rule feeds
// ============================================================

pub async fn rules(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedParams>,
) -> ApiResult<FeedResponse<RulesPayload>> {
    let feeds = &state.feeds;
    let loaded = feeds.load_rules(params.path.as_deref()).await;
    Ok(Json(FeedResponse::from_state(
        feeds.rules_locator(params.path.as_deref()),
        &loaded,
        |batch| batch.dropped,
        |batch| RulesPayload::from(batch),
        feeds.panels().render_rules(&loaded),
    )))
}

pub async fn alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertParams>,
) -> ApiResult<FeedResponse<Vec<AlertView>>> {
    let feeds = &state.feeds;
    let limit = params.limit.unwrap_or(feeds.config().alerts_limit);
    if limit == 0 {
        return Err(api_error(StatusCode::BAD_REQUEST, "limit must be at least 1"));
    }

    let path = params.path.as_deref();
    let (loaded, locator) = if params.from_rules {
        let loaded = feeds.alerts_from_rules(path, limit).await;
        (loaded, feeds.rules_locator(path))
    } else {
        let loaded = feeds.load_alerts(path).await;
        (loaded, feeds.alerts_locator(path))
    };

    let loaded = match loaded {
        LoadState::Ready(batch) => LoadState::Ready(Arc::new(Batch {
            records: top_alerts(&batch.records, limit),
            dropped: batch.dropped,
        })),
        other => other,
    };

    Ok(Json(FeedResponse::from_state(
        locator,
        &loaded,
        |batch| batch.dropped,
        |batch| {
            batch
                .records
                .iter()
                .map(|alert| AlertView {
                    tier: alert.tier(),
                    alert: alert.clone(),
                })
                .collect()
        },
        feeds.panels().render_alerts_limited(&loaded, limit),
    )))
}

pub async fn address_detail(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(params): Query<FeedParams>,
) -> ApiResult<FeedResponse<DetailPayload>> {
    let feeds = &state.feeds;
    let address = validate_address(&address)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let (loaded, locator) = match params.path.as_deref() {
        Some(path) => (feeds.load_detail_at(path).await, path.to_string()),
        None => {
            let loaded = feeds
                .load_detail(address)
                .await
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
            (loaded, feeds.detail_locator(address))
        }
    };

    Ok(Json(FeedResponse::from_state(
        locator,
        &loaded,
        |_| 0,
        |detail| DetailPayload::from(detail),
        feeds.panels().render_detail(&loaded),
    )))
}
