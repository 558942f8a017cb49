//! Media delivery through a virtual link.

use axum::extract::{Path, State};
use axum::response::Response;
use vl_core::{Error, LinkCodec};

use crate::client::ClientAddr;
use crate::context::AppContext;
use crate::error::AppError;

/// GET <stream_path>/{encoded}
///
/// Decode, look up, admit, relay. Admission happens after the lookup so a
/// dead link never consumes quota.
pub async fn stream(
    State(ctx): State<AppContext>,
    Path(encoded): Path<String>,
    ClientAddr(ip): ClientAddr,
) -> Result<Response, AppError> {
    let handle = LinkCodec::decode(&encoded)?;
    let entry = ctx
        .cache
        .get(handle)
        .await
        .ok_or_else(|| Error::LinkNotFound(encoded.clone()))?;

    let permit = ctx.gate.admit(ip)?;
    tracing::info!(handle = %handle, client = %ip, in_flight = ctx.gate.in_flight(), "streaming");

    Ok(ctx.relay.deliver(&entry, permit).await?)
}
