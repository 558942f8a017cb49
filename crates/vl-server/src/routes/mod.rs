//! Route handlers for the HTTP API.

pub mod health;
pub mod links;
pub mod resolve;
pub mod status;
pub mod stream;

use axum::http::{header, HeaderMap};
use vl_core::config::ServerConfig;

/// Scheme and authority virtual links are minted under.
///
/// `public_url` wins; otherwise the request's `Host` is used, with the
/// scheme taken from `X-Forwarded-Proto` only behind a trusted proxy.
pub(crate) fn link_base(server: &ServerConfig, headers: &HeaderMap) -> String {
    if let Some(url) = &server.public_url {
        return url.trim_end_matches('/').to_string();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("localhost:{}", server.port));

    let scheme = if server.trust_forwarded_for {
        headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|s| matches!(*s, "http" | "https"))
            .unwrap_or("http")
    } else {
        "http"
    };

    format!("{scheme}://{host}")
}
