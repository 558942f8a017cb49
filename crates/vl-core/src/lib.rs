//! vl-core: shared types, errors, configuration, and the virtual-link codec.
//!
//! This crate is the foundational dependency for all other vl-* crates,
//! providing the opaque [`Handle`] identifier, the resolution data model, a
//! unified error type, application configuration, and the reversible
//! encoding used inside virtual links.

pub mod config;
pub mod error;
pub mod ids;
pub mod link;
pub mod resolution;
pub mod source;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::Handle;
pub use link::LinkCodec;
pub use resolution::{is_expired, CacheEntry, DeliveryTarget, ResolutionResult, DEFAULT_TITLE};
pub use source::SourceMatcher;
