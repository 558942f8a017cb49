//! vl-server: HTTP API, delivery gate and streaming relay.
//!
//! This crate ties the other vl-* crates into a running server:
//!
//! - Axum routes to resolve source URLs, look up and stream virtual links
//! - A [`gate::DeliveryGate`] bounding concurrent and per-client streams
//! - A [`relay::StreamRelay`] piping upstream bytes to clients
//! - Startup checks, background sweeps, and graceful shutdown

pub mod client;
pub mod context;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod relay;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vl_core::config::Config;
use vl_extract::{load_credentials, HttpFetcher, ToolRegistry, YtDlpExtractor};

use crate::context::AppContext;

/// How often stale per-client rate limiter state is dropped.
const GATE_HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

/// Start the vidlink server.
///
/// Verifies the cookie jar and the extractor (either failing aborts
/// startup), builds the [`AppContext`], spawns the cache sweep and gate
/// housekeeping tasks, and serves HTTP until a shutdown signal arrives.
pub async fn start(config: Config) -> vl_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }
    config.check_routes()?;

    let cookies = load_credentials(&config.upstream.cookies_path).await?;
    tracing::info!(
        path = %config.upstream.cookies_path.display(),
        cookies = cookies.split("; ").count(),
        "Cookie jar loaded"
    );

    let tools = ToolRegistry::discover(&config.extractor);
    let version = tools.verify_extractor().await?;
    let tool = tools.require_extractor()?.clone();
    tracing::info!("Extractor found: {} ({version}) at {}", tool.name, tool.path.display());

    let extractor = Arc::new(YtDlpExtractor::new(tool, &config.extractor, &config.upstream));
    let fetcher = Arc::new(HttpFetcher::new(&config.upstream)?);
    let store = vl_cache::open_store(&config.cache).await?;

    let ctx = AppContext::build(config.clone(), extractor, fetcher, store, tools)?;

    let cancel = CancellationToken::new();

    let sweep_handle = vl_cache::start_sweep_task(
        ctx.cache.clone(),
        Duration::from_secs(config.cache.sweep_interval_secs),
        cancel.clone(),
    );
    let housekeeping_handle =
        gate::start_housekeeping_task(ctx.gate.clone(), GATE_HOUSEKEEPING_INTERVAL, cancel.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| vl_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let app = router::build_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| vl_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!(
        "Listening on {addr} (resolve: {}, stream: {}/{{id}})",
        config.routes.resolve_path,
        config.routes.stream_path
    );

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(cancel.clone()))
    .await;

    // Signal background tasks to stop.
    cancel.cancel();
    let _ = tokio::join!(sweep_handle, housekeeping_handle);

    served.map_err(|e| vl_core::Error::Internal(format!("Server error: {e}")))?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
