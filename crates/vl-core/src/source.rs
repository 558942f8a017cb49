//! Syntactic guard for source page URLs.

use regex::Regex;

use crate::error::{Error, Result};

/// Decides whether a submitted URL is worth resolving.
///
/// This is a pure check run before either resolution strategy; it does not
/// touch the network.
#[derive(Debug, Clone)]
pub struct SourceMatcher {
    pattern: Regex,
}

impl SourceMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::Validation(format!("invalid source pattern: {e}")))?;
        Ok(Self { pattern })
    }

    /// True for absolute http(s) URLs matching the pattern.
    pub fn matches(&self, url: &str) -> bool {
        let url = url.trim();
        (url.starts_with("http://") || url.starts_with("https://")) && self.pattern.is_match(url)
    }

    /// Return the trimmed URL, or [`Error::InvalidUrl`].
    pub fn check<'a>(&self, url: &'a str) -> Result<&'a str> {
        if self.matches(url) {
            Ok(url.trim())
        } else {
            Err(Error::InvalidUrl(url.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> SourceMatcher {
        SourceMatcher::new(r"tiktok\.com/.*/video/\d+").unwrap()
    }

    #[test]
    fn accepts_video_pages() {
        let m = matcher();
        assert!(m.matches("https://www.tiktok.com/@someone/video/7234567890123456789"));
        assert!(m.matches("https://tiktok.com/@u/video/123?lang=en"));
    }

    #[test]
    fn rejects_other_urls() {
        let m = matcher();
        assert!(!m.matches("https://www.tiktok.com/@someone"));
        assert!(!m.matches("https://example.com/video/123"));
        assert!(!m.matches("tiktok.com/@u/video/123"));
        assert!(!m.matches(""));
    }

    #[test]
    fn check_maps_to_invalid_url() {
        let err = matcher().check("https://example.com").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn bad_pattern_is_rejected() {
        assert!(SourceMatcher::new("(").is_err());
    }
}
