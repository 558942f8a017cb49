//! Reversible encoding of handles into virtual-link path segments.
//!
//! The encoding only makes handles URL-friendly. It is not an access control
//! boundary: a decoded handle that is not in the cache is simply a miss.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use crate::error::{Error, Result};
use crate::ids::Handle;

/// Encoder/decoder for the path segment carried by a virtual link.
pub struct LinkCodec;

impl LinkCodec {
    /// Encode `handle` as URL-safe base64 (no padding) of its hyphenated form.
    pub fn encode(handle: &Handle) -> String {
        URL_SAFE_NO_PAD.encode(handle.to_string())
    }

    /// Decode a path segment back into a handle.
    ///
    /// Accepts the canonical URL-safe form as well as standard padded base64.
    pub fn decode(encoded: &str) -> Result<Handle> {
        let trimmed = encoded.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidEncodedId("empty id".into()));
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(trimmed)
            .or_else(|_| STANDARD.decode(trimmed))
            .map_err(|e| Error::InvalidEncodedId(format!("not base64: {e}")))?;

        let text = std::str::from_utf8(&bytes)
            .map_err(|_| Error::InvalidEncodedId("decoded id is not UTF-8".into()))?;

        text.parse::<Handle>()
            .map_err(|e| Error::InvalidEncodedId(format!("decoded id is not a handle: {e}")))
    }

    /// Build `<base>/<stream_path>/<encode(handle)>`.
    pub fn virtual_link(base: &str, stream_path: &str, handle: &Handle) -> String {
        format!(
            "{}/{}/{}",
            base.trim_end_matches('/'),
            stream_path.trim_matches('/'),
            Self::encode(handle)
        )
    }
}
