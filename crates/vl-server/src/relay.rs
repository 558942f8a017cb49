//! Streaming relay: pipe upstream media bytes to the client.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use vl_core::{CacheEntry, DeliveryTarget, Error, Result};
use vl_extract::{ByteStream, MediaFetcher};

use crate::gate::DeliveryPermit;

/// Fetches the media behind a cache entry and turns it into a response body.
pub struct StreamRelay {
    fetcher: Arc<dyn MediaFetcher>,
    media_type: String,
}

impl StreamRelay {
    pub fn new(fetcher: Arc<dyn MediaFetcher>, media_type: impl Into<String>) -> Self {
        Self {
            fetcher,
            media_type: media_type.into(),
        }
    }

    /// Open the upstream for `entry` and build a streaming response.
    ///
    /// `permit` moves into the body and is released when the body is
    /// finished, fails, or is dropped by a disconnecting client. Failures
    /// before the first byte are [`Error::Streaming`].
    pub async fn deliver(&self, entry: &CacheEntry, permit: DeliveryPermit) -> Result<Response> {
        let fetched = match entry.result.delivery_target() {
            DeliveryTarget::Locator(locator) => self.fetcher.fetch_locator(locator).await,
            DeliveryTarget::Source(page) => self.fetcher.fetch_source(page).await,
        }
        .map_err(|e| {
            tracing::error!(handle = %entry.handle, error = %e, "upstream unavailable for stream");
            Error::Streaming(e.to_string())
        })?;

        let mut builder = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, &self.media_type);
        if let Some(len) = fetched.content_length {
            builder = builder.header(header::CONTENT_LENGTH, len);
        }

        let body = PermitStream {
            inner: fetched.body,
            _permit: permit,
        };

        builder
            .body(Body::from_stream(body))
            .map_err(|e| Error::Internal(format!("failed to build stream response: {e}")))
    }
}

/// Upstream body that owns a concurrency slot for as long as it lives.
struct PermitStream {
    inner: ByteStream,
    _permit: DeliveryPermit,
}

impl Stream for PermitStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::DeliveryGate;
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use vl_core::config::DeliveryConfig;
    use vl_core::{Handle, ResolutionResult};
    use vl_extract::FetchedMedia;

    fn entry(locator: Option<&str>) -> CacheEntry {
        let mut result = ResolutionResult::direct("https://www.tiktok.com/@u/video/1");
        result.stream_locator = locator.map(str::to_string);
        CacheEntry::new(Handle::new(), result, Default::default())
    }

    /// Serves a body naming the method that was called.
    struct FixedFetcher {
        fail: bool,
    }

    #[async_trait]
    impl MediaFetcher for FixedFetcher {
        async fn fetch_source(&self, _source_url: &str) -> Result<FetchedMedia> {
            self.respond(b"from-source")
        }

        async fn fetch_locator(&self, _locator: &str) -> Result<FetchedMedia> {
            self.respond(b"from-locator")
        }
    }

    impl FixedFetcher {
        fn respond(&self, body: &'static [u8]) -> Result<FetchedMedia> {
            if self.fail {
                return Err(Error::Fetch("connection refused".into()));
            }
            let chunks = vec![Ok(Bytes::from_static(body))];
            Ok(FetchedMedia {
                content_type: Some("application/octet-stream".into()),
                content_length: Some(body.len() as u64),
                body: Box::pin(futures::stream::iter(chunks)),
            })
        }
    }

    fn gate() -> DeliveryGate {
        DeliveryGate::new(&DeliveryConfig {
            max_concurrent: 1,
            rate_limit_max: 0,
            rate_limit_window_secs: 900,
        })
    }

    #[tokio::test]
    async fn prefers_locator_and_sets_headers() {
        let relay = StreamRelay::new(Arc::new(FixedFetcher { fail: false }), "video/mp4");
        let gate = gate();

        let response = relay
            .deliver(&entry(Some("https://cdn.example/v.mp4")), gate.try_acquire().unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "12");
        assert_eq!(gate.in_flight(), 1);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"from-locator");
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn falls_back_to_source_without_locator() {
        let relay = StreamRelay::new(Arc::new(FixedFetcher { fail: false }), "video/mp4");
        let gate = gate();
        let response = relay.deliver(&entry(None), gate.try_acquire().unwrap()).await.unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"from-source");
    }

    #[tokio::test]
    async fn dropped_body_releases_slot() {
        let relay = StreamRelay::new(Arc::new(FixedFetcher { fail: false }), "video/mp4");
        let gate = gate();
        let response = relay.deliver(&entry(None), gate.try_acquire().unwrap()).await.unwrap();
        assert_eq!(gate.in_flight(), 1);
        drop(response);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn upstream_failure_is_streaming_error_and_frees_slot() {
        let relay = StreamRelay::new(Arc::new(FixedFetcher { fail: true }), "video/mp4");
        let gate = gate();
        let err = relay
            .deliver(&entry(None), gate.try_acquire().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Streaming(_)));
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(gate.in_flight(), 0);
    }
}
