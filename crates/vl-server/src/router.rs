//! Route table and middleware stack.

use std::path::Path;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_status::SetStatus;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

/// Assemble the application.
///
/// The resolve and stream paths come from configuration; everything else
/// is fixed. When `server.static_dir` exists it serves as the fallback, with
/// unknown paths answered by its `index.html`.
pub fn build_router(ctx: AppContext) -> Router {
    let paths = &ctx.config.routes;
    let stream_route = format!("{}/{{encoded}}", paths.stream_path);

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/status", get(routes::status::status))
        .route("/get-stream/{encoded}", get(routes::links::get_stream))
        .route(&paths.resolve_path, get(routes::resolve::resolve))
        .route(&stream_route, get(routes::stream::stream));

    if let Some(dir) = ctx.config.server.static_dir.as_deref() {
        match static_files(dir) {
            Some(files) => app = app.fallback_service(files),
            None => tracing::warn!(dir = %dir.display(), "static_dir missing; not serving files"),
        }
    }

    app.layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn static_files(dir: &Path) -> Option<ServeDir<SetStatus<ServeFile>>> {
    if !dir.is_dir() {
        return None;
    }
    tracing::info!(dir = %dir.display(), "serving static files");
    Some(
        ServeDir::new(dir)
            .append_index_html_on_directories(true)
            .not_found_service(ServeFile::new(dir.join("index.html"))),
    )
}
