//! # vl-extract
//!
//! Turning a source page URL into something playable.
//!
//! This crate provides:
//!
//! - **Credential loading** ([`credentials`]) -- derive a `Cookie` header from
//!   a Netscape cookie jar, re-read on every use.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running the external extractor.
//! - **Tool discovery** ([`ToolRegistry`]) -- locate the extractor and check
//!   that it answers `--version`.
//! - **Strategies** -- the [`Extractor`] trait ([`YtDlpExtractor`]) and the
//!   [`MediaFetcher`] trait ([`HttpFetcher`]).
//! - **Resolution** ([`Resolver`]) -- bounded retry of extraction with a
//!   fallback to direct fetch.

pub mod command;
pub mod credentials;
pub mod extractor;
pub mod fetch;
pub mod resolver;
pub mod retry;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use credentials::{load_credentials, parse_cookie_jar};
pub use extractor::{parse_dump, ExtractedMedia, Extractor, YtDlpExtractor};
pub use fetch::{ByteStream, FetchedMedia, HttpFetcher, MediaFetcher};
pub use resolver::Resolver;
pub use retry::RetryPolicy;
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
