//! Runtime status.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub version: &'static str,
    pub in_flight: usize,
    pub max_concurrent: usize,
    pub cache_backend: String,
    pub extractor: String,
}

/// GET /api/status
pub async fn status(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        in_flight: ctx.gate.in_flight(),
        max_concurrent: ctx.gate.max_concurrent(),
        cache_backend: ctx.cache.backend().to_string(),
        extractor: ctx.resolver.extractor_name().to_string(),
    })
}
