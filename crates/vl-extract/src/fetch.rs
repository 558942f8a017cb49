//! Authenticated HTTP access to the upstream host.
//!
//! [`MediaFetcher`] serves two callers: the resolver's direct-fetch strategy
//! (GET of the source page) and the streaming relay (GET of the extracted
//! locator). Both send a fresh credential string on every request.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, ORIGIN, REFERER, USER_AGENT};
use vl_core::config::UpstreamConfig;
use vl_core::{Error, Result};

use crate::credentials::load_credentials;

/// Boxed stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// An upstream response whose headers have arrived and whose body has not
/// been read yet.
pub struct FetchedMedia {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl fmt::Debug for FetchedMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchedMedia")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// GET the source page itself, as the direct-fetch strategy does.
    async fn fetch_source(&self, source_url: &str) -> Result<FetchedMedia>;

    /// GET an extracted media locator for relaying.
    async fn fetch_locator(&self, locator: &str) -> Result<FetchedMedia>;
}

/// [`MediaFetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    upstream: UpstreamConfig,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(upstream: &UpstreamConfig) -> Result<Self> {
        let timeout = Duration::from_millis(upstream.timeout_ms);
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            upstream: upstream.clone(),
            timeout,
        })
    }

    async fn get(&self, url: &str, with_origin: bool) -> Result<FetchedMedia> {
        let cookie = load_credentials(&self.upstream.cookies_path).await?;

        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, &self.upstream.user_agent)
            .header(REFERER, &self.upstream.referer)
            .header(COOKIE, cookie)
            .header(ACCEPT, &self.upstream.media_type);
        if with_origin {
            request = request.header(ORIGIN, &self.upstream.origin);
        }

        // The timeout covers connection and headers only; the body may take
        // as long as the client keeps reading.
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| Error::Fetch(format!("{url}: no response within {:?}", self.timeout)))?
            .map_err(|e| Error::Fetch(format!("{url}: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();
        let body = response.bytes_stream().map_err(std::io::Error::other);

        Ok(FetchedMedia {
            content_type,
            content_length,
            body: Box::pin(body),
        })
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch_source(&self, source_url: &str) -> Result<FetchedMedia> {
        tracing::debug!(url = source_url, "direct fetch");
        self.get(source_url, true).await
    }

    async fn fetch_locator(&self, locator: &str) -> Result<FetchedMedia> {
        tracing::debug!(url = locator, "locator fetch");
        self.get(locator, false).await
    }
}
