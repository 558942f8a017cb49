//! The data produced by a resolution and the record the cache keeps for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::Handle;

/// Title used when the extractor reports none, or when only the direct
/// fetch succeeded.
pub const DEFAULT_TITLE: &str = "Untitled Video";

/// Outcome of resolving a source page URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    /// The page URL the client submitted.
    pub source_url: String,
    /// Direct media URL reported by the extractor. `None` when only the
    /// direct fetch succeeded, in which case delivery re-fetches `source_url`.
    pub stream_locator: Option<String>,
    pub title: String,
    pub thumbnail: String,
    pub external_id: String,
}

impl ResolutionResult {
    /// Result of a successful extraction.
    pub fn extracted(
        source_url: impl Into<String>,
        stream_locator: impl Into<String>,
        title: Option<String>,
        thumbnail: Option<String>,
        external_id: Option<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            stream_locator: Some(stream_locator.into()),
            title: title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            thumbnail: thumbnail.unwrap_or_default(),
            external_id: external_id.unwrap_or_default(),
        }
    }

    /// Result of a successful direct fetch: no locator, no metadata.
    pub fn direct(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            stream_locator: None,
            title: DEFAULT_TITLE.to_string(),
            thumbnail: String::new(),
            external_id: String::new(),
        }
    }

    /// What delivery should fetch: the locator when present, otherwise the
    /// source page again.
    pub fn delivery_target(&self) -> DeliveryTarget<'_> {
        match &self.stream_locator {
            Some(locator) => DeliveryTarget::Locator(locator),
            None => DeliveryTarget::Source(&self.source_url),
        }
    }
}

/// Upstream URL a stream is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryTarget<'a> {
    /// Direct media URL from extraction.
    Locator(&'a str),
    /// The page URL, for results that only the direct fetch produced.
    Source(&'a str),
}

/// A cached resolution, keyed by its handle.
///
/// Entries are immutable once stored; the cache only inserts and evicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub handle: Handle,
    #[serde(flatten)]
    pub result: ResolutionResult,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(handle: Handle, result: ResolutionResult, created_at: DateTime<Utc>) -> Self {
        Self {
            handle,
            result,
            created_at,
        }
    }
}

/// Whether something created at `created_at` is older than `ttl` at `now`.
/// Exactly `ttl` old is not expired.
pub fn is_expired(created_at: DateTime<Utc>, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
    now - created_at > ttl
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn extracted_fills_defaults() {
        let r = ResolutionResult::extracted(
            "https://www.tiktok.com/@u/video/1",
            "https://cdn.example/v.mp4",
            None,
            None,
            None,
        );
        assert_eq!(r.title, DEFAULT_TITLE);
        assert_eq!(r.thumbnail, "");
        assert_eq!(r.external_id, "");
        assert_eq!(
            r.delivery_target(),
            DeliveryTarget::Locator("https://cdn.example/v.mp4")
        );
    }

    #[test]
    fn empty_title_falls_back() {
        let r = ResolutionResult::extracted("s", "https://x/v", Some(String::new()), None, None);
        assert_eq!(r.title, DEFAULT_TITLE);
    }

    #[test]
    fn direct_has_no_locator() {
        let r = ResolutionResult::direct("https://www.tiktok.com/@u/video/1");
        assert!(r.stream_locator.is_none());
        assert_eq!(
            r.delivery_target(),
            DeliveryTarget::Source("https://www.tiktok.com/@u/video/1")
        );
    }

    #[test]
    fn expiry_is_strict() {
        let created = Utc::now();
        let ttl = Duration::seconds(300);
        assert!(!is_expired(created, created + ttl, ttl));
        assert!(is_expired(created, created + ttl + Duration::milliseconds(1), ttl));
    }

    #[test]
    fn entry_serializes_flat_camel_case() {
        let entry = CacheEntry::new(
            Handle::new(),
            ResolutionResult::direct("https://www.tiktok.com/@u/video/1"),
            Utc::now(),
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["sourceUrl"], "https://www.tiktok.com/@u/video/1");
        assert!(value["streamLocator"].is_null());
        assert!(value.get("createdAt").is_some());
        let back: CacheEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }
}
