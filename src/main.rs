use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tracex_dashboard::api::{self, AppState};
use tracex_dashboard::config::Config;
use tracex_dashboard::dashboard::{Dashboard, Feeds};
use tracex_dashboard::loader::FeedSource;
use tracex_dashboard::panels::Panels;
use tracex_dashboard::store::Dataset;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=debug for loader and graph detail)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("TraceX dashboard starting");

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    tracing::info!(
        dataset = %config.dataset.path,
        feeds = %config.feeds.root,
        "Configuration loaded from {}",
        config_path
    );

    // Token metrics are held in memory for the lifetime of the process
    let dataset = Dataset::load(&config.dataset.path)?;
    let dashboard = Dashboard::new(
        dataset,
        config.graph.render_options(),
        config.dataset.default_chain.as_deref(),
    );
    tracing::info!(chain = dashboard.chain(), "Dashboard initialized");

    let source = Arc::new(FeedSource::new(&config.feeds.root)?);
    let panels = Panels::new().with_alerts_limit(config.feeds.alerts_limit);
    let feeds = Feeds::new(source, config.feeds.clone(), panels);

    let state = AppState::new(dashboard, feeds);
    let shutdown = CancellationToken::new();

    if !config.api.enabled {
        tracing::warn!("API disabled in config, nothing to serve");
        return Ok(());
    }

    // Spawn API server
    let server = {
        let host = config.api.host.clone();
        let port = config.api.port;
        let static_dir = config.api.static_dir.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = api::serve(state, &host, port, static_dir.as_deref(), shutdown).await {
                tracing::error!(error = %e, "API server failed");
            }
        })
    };

    tracing::info!("Dashboard API started. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping API server...");
    shutdown.cancel();
    let _ = server.await;

    tracing::info!("TraceX dashboard stopped gracefully");
    Ok(())
}
