//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`vl_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` on core results.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use vl_core::Error;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: Error,
}

impl AppError {
    pub fn new(inner: Error) -> Self {
        Self { inner }
    }

    /// Extra structured context for the `details` field, if any.
    fn details(&self) -> Option<Value> {
        match &self.inner {
            Error::Resolution {
                extraction,
                direct_fetch,
            } => Some(json!({
                "extraction": extraction,
                "directFetch": direct_fetch,
            })),
            Error::Streaming(message) => Some(Value::String(message.clone())),
            Error::TooManyConcurrentRequests { limit } => Some(json!({ "limit": limit })),
            Error::RateLimitExceeded { retry_after_secs } => {
                Some(json!({ "retryAfterSecs": retry_after_secs }))
            }
            _ => None,
        }
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.inner, "server error in API handler");
        } else {
            tracing::debug!(status = %status, error = %self.inner, "request rejected");
        }

        let mut body = json!({
            "error": self.inner.code(),
            "message": self.inner.to_string(),
        });
        if let Some(details) = self.details() {
            body["details"] = details;
        }

        let mut response = (status, axum::Json(body)).into_response();

        if let Error::RateLimitExceeded { retry_after_secs } = self.inner {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
