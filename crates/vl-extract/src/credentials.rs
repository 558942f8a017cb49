//! Upstream credentials derived from a Netscape-format cookie jar.
//!
//! The jar is re-read on every call so edits to the file take effect on the
//! next upstream request without a restart.

use std::path::Path;

use vl_core::{Error, Result};

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Build a `Cookie` header value (`name=value; name=value`) from jar contents.
///
/// Blank lines and `#` comments are skipped, except `#HttpOnly_` lines which
/// browsers use to mark http-only cookies. Lines with fewer than seven
/// tab-separated fields, or with an empty name or value, are ignored.
pub fn parse_cookie_jar(contents: &str) -> Result<String> {
    let mut pairs = Vec::new();

    for line in contents.lines() {
        let line = line.trim();
        let line = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => rest,
            None if line.is_empty() || line.starts_with('#') => continue,
            None => line,
        };

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            continue;
        }

        let name = fields[5].trim();
        let value = fields[6].trim();
        if name.is_empty() || value.is_empty() {
            continue;
        }

        pairs.push(format!("{name}={value}"));
    }

    if pairs.is_empty() {
        return Err(Error::Credentials("no valid cookies found".into()));
    }

    Ok(pairs.join("; "))
}

/// Read the jar at `path` and derive the credential string.
pub async fn load_credentials(path: &Path) -> Result<String> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::Credentials(format!("cannot read cookie jar {}: {e}", path.display()))
    })?;
    parse_cookie_jar(&contents)
}
