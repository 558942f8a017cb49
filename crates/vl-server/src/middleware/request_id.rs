//! Per-request correlation ids.
//!
//! Every request runs inside a `request` span tagged with an id. A sane
//! client-supplied `x-request-id` is reused, otherwise one is minted. The
//! id is echoed on the response so clients can quote it in bug reports.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Longest client-supplied id we are willing to echo.
const MAX_ID_LEN: usize = 128;

/// The caller's id if it is printable and short, else a fresh UUID.
fn correlation_id(headers: &HeaderMap) -> String {
    match headers.get(&X_REQUEST_ID).map(HeaderValue::to_str) {
        Some(Ok(id)) if !id.is_empty() && id.len() <= MAX_ID_LEN => id.to_owned(),
        _ => Uuid::new_v4().to_string(),
    }
}

pub async fn request_id_middleware(request: Request<Body>, next: Next) -> Response {
    let id = correlation_id(request.headers());
    let span = tracing::info_span!("request", request_id = %id, path = %request.uri().path());

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn headers(id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(&X_REQUEST_ID, HeaderValue::from_str(id).unwrap());
        headers
    }

    #[test]
    fn oversized_ids_are_replaced() {
        assert_eq!(correlation_id(&headers("abc-123")), "abc-123");

        let long = "x".repeat(MAX_ID_LEN + 1);
        let id = correlation_id(&headers(&long));
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn middleware_echoes_or_mints() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(request_id_middleware));

        let echoed = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(echoed.headers()["x-request-id"], "abc-123");

        let minted = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let id = minted.headers()["x-request-id"].to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }
}
