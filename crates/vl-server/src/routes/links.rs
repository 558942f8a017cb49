//! Virtual-link lookup.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use vl_core::{Error, LinkCodec};

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::link_base;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamLinkResponse {
    pub stream_url: String,
}

/// GET /get-stream/{encoded}
///
/// Confirms the link is still live and returns its canonical form. The
/// upstream locator is never disclosed.
pub async fn get_stream(
    State(ctx): State<AppContext>,
    Path(encoded): Path<String>,
    headers: HeaderMap,
) -> Result<Json<StreamLinkResponse>, AppError> {
    let handle = LinkCodec::decode(&encoded)?;
    let entry = ctx
        .cache
        .get(handle)
        .await
        .ok_or_else(|| Error::LinkNotFound(encoded.clone()))?;

    Ok(Json(StreamLinkResponse {
        stream_url: LinkCodec::virtual_link(
            &link_base(&ctx.config.server, &headers),
            &ctx.config.routes.stream_path,
            &entry.handle,
        ),
    }))
}
