//! Unified error type for vidlink.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`]
//! and a stable machine-readable code via [`Error::code`].

/// Unified error type covering all failure modes in vidlink.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested source URL is missing or does not look like a video page.
    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),

    /// A virtual-link segment could not be decoded into a handle.
    #[error("Invalid encoded id: {0}")]
    InvalidEncodedId(String),

    /// Configuration or request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The handle is unknown or its entry has expired.
    #[error("Virtual link not found: {0}")]
    LinkNotFound(String),

    /// The process-wide streaming ceiling is saturated.
    #[error("Too many concurrent streams (limit {limit})")]
    TooManyConcurrentRequests {
        /// The configured ceiling.
        limit: usize,
    },

    /// The client exceeded its streaming quota for the current window.
    #[error("Rate limit exceeded; retry in {retry_after_secs}s")]
    RateLimitExceeded {
        /// Seconds until the client may try again.
        retry_after_secs: u64,
    },

    /// The external extractor could not produce a playable locator.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Fetching media directly from upstream failed.
    #[error("Direct fetch failed: {0}")]
    Fetch(String),

    /// Every resolution strategy failed.
    #[error("All resolution methods failed (extraction: {extraction}; direct fetch: {direct_fetch})")]
    Resolution {
        /// Last error reported by the extraction strategy.
        extraction: String,
        /// Error reported by the direct-fetch strategy.
        direct_fetch: String,
    },

    /// Relaying the media body to the client failed before the first byte.
    #[error("Streaming failed: {0}")]
    Streaming(String),

    /// The cookie jar could not be read or held no usable cookies.
    #[error("Credentials unavailable: {0}")]
    Credentials(String),

    /// An external tool returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidUrl(_) => 400,
            Error::InvalidEncodedId(_) => 400,
            Error::Validation(_) => 400,
            Error::LinkNotFound(_) => 404,
            Error::TooManyConcurrentRequests { .. } => 429,
            Error::RateLimitExceeded { .. } => 429,
            Error::Resolution { .. } => 500,
            Error::Streaming(_) => 500,
            Error::Extraction(_) => 502,
            Error::Fetch(_) => 502,
            Error::Tool { .. } => 502,
            Error::Credentials(_) => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Stable error code returned to API clients in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidUrl(_) => "URL_INVALID",
            Error::InvalidEncodedId(_) => "INVALID_ENCODED_ID",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::LinkNotFound(_) => "VIRTUAL_LINK_NOT_FOUND",
            Error::TooManyConcurrentRequests { .. } => "TOO_MANY_CONCURRENT_REQUESTS",
            Error::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Error::Resolution { .. } => "ALL_METHODS_FAILED",
            Error::Streaming(_) => "STREAMING_FAILED",
            Error::Extraction(_) => "EXTRACTION_FAILED",
            Error::Fetch(_) => "DIRECT_FETCH_FAILED",
            Error::Tool { .. } => "TOOL_ERROR",
            Error::Credentials(_) => "CREDENTIALS_UNAVAILABLE",
            Error::Io { .. } => "IO_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
