//! Dual-strategy resolution: extraction with retry, then direct fetch.

use std::sync::Arc;

use vl_core::{Error, ResolutionResult, Result};

use crate::extractor::{ExtractedMedia, Extractor};
use crate::fetch::MediaFetcher;
use crate::retry::RetryPolicy;

/// Resolves source page URLs into [`ResolutionResult`]s.
///
/// Callers are expected to have validated the URL already.
#[derive(Clone)]
pub struct Resolver {
    extractor: Arc<dyn Extractor>,
    fetcher: Arc<dyn MediaFetcher>,
    retry: RetryPolicy,
}

impl Resolver {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        fetcher: Arc<dyn MediaFetcher>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            extractor,
            fetcher,
            retry,
        }
    }

    pub fn extractor_name(&self) -> &str {
        self.extractor.name()
    }

    /// Resolve `source_url`.
    ///
    /// Extraction is retried per the [`RetryPolicy`]; if it never succeeds
    /// the direct fetch is tried once. When both fail the error carries both
    /// messages.
    pub async fn resolve(&self, source_url: &str) -> Result<ResolutionResult> {
        let extraction = self
            .retry
            .run("extraction", |attempt| self.extract_once(source_url, attempt))
            .await;

        let extraction_err = match extraction {
            Ok(media) => {
                tracing::info!(url = source_url, "resolved via extraction");
                return Ok(ResolutionResult::extracted(
                    source_url,
                    media.locator,
                    media.title,
                    media.thumbnail,
                    media.id,
                ));
            }
            Err(e) => e,
        };

        tracing::warn!(url = source_url, error = %extraction_err, "extraction exhausted; trying direct fetch");

        match self.fetcher.fetch_source(source_url).await {
            // Only reachability matters here; the body is dropped unread.
            Ok(_media) => {
                tracing::info!(url = source_url, "resolved via direct fetch");
                Ok(ResolutionResult::direct(source_url))
            }
            Err(fetch_err) => {
                tracing::error!(url = source_url, error = %fetch_err, "all resolution methods failed");
                Err(Error::Resolution {
                    extraction: extraction_err.to_string(),
                    direct_fetch: fetch_err.to_string(),
                })
            }
        }
    }

    async fn extract_once(&self, source_url: &str, attempt: u32) -> Result<ExtractedMedia> {
        tracing::debug!(url = source_url, attempt, extractor = self.extractor.name(), "extracting");
        self.extractor.extract(source_url).await
    }
}
