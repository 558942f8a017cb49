//! Source URL resolution.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use vl_core::{Error, Handle, LinkCodec};

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::link_base;

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub handle: Handle,
    pub link: String,
}

/// GET <resolve_path>?url=<page url>
pub async fn resolve(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<ResolveResponse>, AppError> {
    let raw = query
        .url
        .ok_or_else(|| Error::InvalidUrl("missing url parameter".into()))?;
    let source_url = ctx.sources.check(&raw)?;

    let result = ctx.resolver.resolve(source_url).await?;

    let id = result.external_id.clone();
    let title = result.title.clone();
    let thumbnail = result.thumbnail.clone();
    let handle = ctx.cache.put(result).await;

    let link = LinkCodec::virtual_link(
        &link_base(&ctx.config.server, &headers),
        &ctx.config.routes.stream_path,
        &handle,
    );
    tracing::info!(handle = %handle, url = source_url, "virtual link issued");

    Ok(Json(ResolveResponse {
        id,
        title,
        thumbnail,
        handle,
        link,
    }))
}
