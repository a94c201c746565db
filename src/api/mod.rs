pub mod handlers;
pub mod types;

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::dashboard::{Dashboard, Feeds};

pub struct AppState {
    pub dashboard: Mutex<Dashboard>,
    pub feeds: Feeds,
}

impl AppState {
    pub fn new(dashboard: Dashboard, feeds: Feeds) -> Arc<Self> {
        Arc::new(Self {
            dashboard: Mutex::new(dashboard),
            feeds,
        })
    }
}

pub fn router(state: Arc<AppState>, static_dir: Option<&str>) -> Router {
    let mut app = Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/chains", get(handlers::chains))
        .route("/api/v1/dashboard", get(handlers::dashboard))
        .route(
            "/api/v1/tokens/{contract}/graph",
            get(handlers::token_graph),
        )
        .route("/api/v1/rules", get(handlers::rules))
        .route("/api/v1/alerts", get(handlers::alerts))
        .route("/api/v1/address/{address}", get(handlers::address_detail))
        .with_state(state);

    if let Some(dir) = static_dir {
        app = app.nest_service("/result", ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    state: Arc<AppState>,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    shutdown: CancellationToken,
) -> eyre::Result<()> {
    let app = router(state, static_dir);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
