//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! sub-configs for the server, routes, extractor, upstream, cache and
//! delivery gate. Every section defaults sensibly so a completely empty `{}`
//! file is valid. Selected values can be overridden from the environment via
//! [`Config::apply_env`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "VIDLINK_";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub routes: RoutesConfig,
    pub extractor: ExtractorConfig,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub delivery: DeliveryConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// The result is normalized (see [`Config::normalize`]).
    pub fn from_json(json_str: &str) -> Result<Self> {
        let mut cfg: Self = serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))?;
        cfg.normalize();
        Ok(cfg)
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Apply `VIDLINK_*` overrides using `lookup` to read variables.
    ///
    /// Taking a lookup function instead of reading `std::env` directly keeps
    /// this testable. Values that fail to parse are skipped and returned as
    /// warnings.
    pub fn apply_env<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        fn parse<T: std::str::FromStr>(
            name: &str,
            raw: Option<String>,
            warnings: &mut Vec<String>,
        ) -> Option<T> {
            let raw = raw?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warnings.push(format!(
                        "{ENV_PREFIX}{name}='{raw}' is not a valid {}; ignored",
                        std::any::type_name::<T>()
                    ));
                    None
                }
            }
        }

        if let Some(v) = var("HOST") {
            self.server.host = v;
        }
        if let Some(v) = parse("PORT", var("PORT"), &mut warnings) {
            self.server.port = v;
        }
        if let Some(v) = var("EXTRACTOR") {
            self.extractor.program = v;
        }
        if let Some(v) = var("USER_AGENT") {
            self.upstream.user_agent = v;
        }
        if let Some(v) = var("COOKIES_PATH") {
            self.upstream.cookies_path = PathBuf::from(v);
        }
        if let Some(v) = var("RESOLVE_PATH") {
            self.routes.resolve_path = v;
        }
        if let Some(v) = var("STREAM_PATH") {
            self.routes.stream_path = v;
        }
        if let Some(v) = parse("RETRY_ATTEMPTS", var("RETRY_ATTEMPTS"), &mut warnings) {
            self.extractor.retry_attempts = v;
        }
        if let Some(v) = parse("RETRY_DELAY_MS", var("RETRY_DELAY_MS"), &mut warnings) {
            self.extractor.retry_delay_ms = v;
        }
        if let Some(v) = var("CACHE_BACKEND") {
            match v.parse() {
                Ok(backend) => self.cache.backend = backend,
                Err(e) => warnings.push(format!("{ENV_PREFIX}CACHE_BACKEND: {e}; ignored")),
            }
        }
        if let Some(v) = var("CACHE_DIR") {
            self.cache.dir = PathBuf::from(v);
        }
        if let Some(v) = parse("CACHE_TTL_SECS", var("CACHE_TTL_SECS"), &mut warnings) {
            self.cache.ttl_secs = v;
        }
        if let Some(v) = parse("MAX_CONCURRENT", var("MAX_CONCURRENT"), &mut warnings) {
            self.delivery.max_concurrent = v;
        }
        if let Some(v) = parse("RATE_LIMIT_MAX", var("RATE_LIMIT_MAX"), &mut warnings) {
            self.delivery.rate_limit_max = v;
        }
        if let Some(v) = parse(
            "RATE_LIMIT_WINDOW_SECS",
            var("RATE_LIMIT_WINDOW_SECS"),
            &mut warnings,
        ) {
            self.delivery.rate_limit_window_secs = v;
        }

        self.normalize();
        warnings
    }

    /// Canonicalize route paths: leading `/`, no trailing `/`.
    pub fn normalize(&mut self) {
        self.routes.resolve_path = normalize_path(&self.routes.resolve_path);
        self.routes.stream_path = normalize_path(&self.routes.stream_path);
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if let Some(ref url) = self.server.public_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                warnings.push(format!(
                    "server.public_url '{url}' is not an absolute http(s) URL"
                ));
            }
        }

        if self.extractor.retry_attempts == 0 {
            warnings.push("extractor.retry_attempts is 0; one attempt will be made".into());
        }

        if self.extractor.timeout_secs == 0 {
            warnings.push("extractor.timeout_secs is 0; extraction will always time out".into());
        }

        if self.upstream.user_agent.trim().is_empty() {
            warnings.push("upstream.user_agent is empty".into());
        }

        if !self.upstream.media_type.contains('/') {
            warnings.push(format!(
                "upstream.media_type '{}' is not a MIME type",
                self.upstream.media_type
            ));
        }

        if self.cache.ttl_secs == 0 {
            warnings.push("cache.ttl_secs is 0; links expire at the next sweep".into());
        }

        if self.cache.sweep_interval_secs == 0 {
            warnings.push("cache.sweep_interval_secs is 0; using 1 second".into());
        }

        if self.delivery.max_concurrent == 0 {
            warnings.push("delivery.max_concurrent is 0; every stream will be rejected".into());
        }

        if self.delivery.rate_limit_max == 0 {
            warnings.push("delivery.rate_limit_max is 0; per-client rate limiting is disabled".into());
        } else if self.delivery.rate_limit_window_secs == 0 {
            warnings.push("delivery.rate_limit_window_secs is 0; using 1 second".into());
        }

        warnings
    }

    /// Fatal route checks: the configured paths must not shadow each other
    /// or the fixed endpoints.
    pub fn check_routes(&self) -> Result<()> {
        let resolve = self.routes.resolve_path.as_str();
        let stream = self.routes.stream_path.as_str();
        let reserved = ["/", "/health", "/get-stream", "/api/status"];

        for (name, path) in [("routes.resolve_path", resolve), ("routes.stream_path", stream)] {
            if reserved.contains(&path) {
                return Err(Error::Validation(format!(
                    "{name} '{path}' collides with a built-in endpoint"
                )));
            }
        }

        if resolve == stream {
            return Err(Error::Validation(format!(
                "routes.resolve_path and routes.stream_path are both '{resolve}'"
            )));
        }

        regex::Regex::new(&self.routes.source_pattern).map_err(|e| {
            Error::Validation(format!("routes.source_pattern is not a valid regex: {e}"))
        })?;

        Ok(())
    }
}

fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    /// Base used when minting virtual links. Derived from the request when unset.
    pub public_url: Option<String>,
    /// Honour `X-Forwarded-For` / `X-Forwarded-Proto` from a reverse proxy.
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            static_dir: None,
            public_url: None,
            trust_forwarded_for: false,
        }
    }
}

/// Public route paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    pub resolve_path: String,
    pub stream_path: String,
    /// Regex a source URL must match before resolution is attempted.
    pub source_pattern: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            resolve_path: "/video".into(),
            stream_path: "/stream".into(),
            source_pattern: r"tiktok\.com/.*/video/\d+".into(),
        }
    }
}

/// External extractor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Program name (looked up on `PATH`) or absolute path.
    pub program: String,
    /// Extra arguments placed before the generated ones.
    pub args: Vec<String>,
    pub timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            program: "yt-dlp".into(),
            args: Vec::new(),
            timeout_secs: 60,
            retry_attempts: 2,
            retry_delay_ms: 1000,
        }
    }
}

/// Headers and credentials used when talking to the upstream host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub user_agent: String,
    pub referer: String,
    pub origin: String,
    /// Netscape-format cookie jar.
    pub cookies_path: PathBuf,
    pub media_type: String,
    /// Bounds connection and response headers, never the body.
    pub timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            referer: "https://www.tiktok.com/".into(),
            origin: "https://www.tiktok.com".into(),
            cookies_path: PathBuf::from("cookies.txt"),
            media_type: "video/mp4".into(),
            timeout_ms: 5000,
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
        .into()
}

/// Which storage backend holds cached resolutions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    File,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackend::Memory => "memory",
            CacheBackend::File => "file",
        }
    }
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "file" => Ok(CacheBackend::File),
            other => Err(format!("unknown cache backend '{other}'")),
        }
    }
}

/// Handle cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Directory for the file backend.
    pub dir: PathBuf,
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            dir: PathBuf::from("./data/links"),
            ttl_secs: 300,
            sweep_interval_secs: 300,
        }
    }
}

/// Streaming admission limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub max_concurrent: usize,
    /// Streams allowed per client per window; `0` disables the limiter.
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 100,
            rate_limit_max: 50,
            rate_limit_window_secs: 900,
        }
    }
}
