//! The extraction strategy: ask an external extractor for a direct media URL.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use vl_core::config::{ExtractorConfig, UpstreamConfig};
use vl_core::{Error, Result};

use crate::command::ToolCommand;
use crate::tools::ToolConfig;

/// What a successful extraction yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMedia {
    /// Absolute http(s) URL of the media itself.
    pub locator: String,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub id: Option<String>,
}

/// A strategy that turns a source page URL into a direct media locator.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short name used in logs and status output.
    fn name(&self) -> &str;

    /// Perform one extraction attempt. Every failure is [`Error::Extraction`].
    async fn extract(&self, source_url: &str) -> Result<ExtractedMedia>;
}

/// Runs a yt-dlp compatible program with `--dump-json`.
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    tool: ToolConfig,
    timeout: Duration,
    upstream: UpstreamConfig,
}

impl YtDlpExtractor {
    pub fn new(tool: ToolConfig, config: &ExtractorConfig, upstream: &UpstreamConfig) -> Self {
        Self {
            tool,
            timeout: Duration::from_secs(config.timeout_secs),
            upstream: upstream.clone(),
        }
    }

    /// Build the invocation for `source_url`.
    pub fn command(&self, source_url: &str) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.tool.path.clone());
        cmd.args(self.tool.args.iter().cloned())
            .arg("--dump-json")
            .arg(source_url)
            .arg("--no-warnings")
            .arg("--user-agent")
            .arg(&self.upstream.user_agent)
            .arg("--referer")
            .arg(&self.upstream.referer)
            .arg("--cookies")
            .arg(self.upstream.cookies_path.to_string_lossy())
            .timeout(self.timeout);
        cmd
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &str {
        &self.tool.name
    }

    async fn extract(&self, source_url: &str) -> Result<ExtractedMedia> {
        let output = self
            .command(source_url)
            .execute()
            .await
            .map_err(|e| Error::Extraction(e.to_string()))?;

        // Even with --no-warnings, anything on stderr means the result is suspect.
        let stderr = output.stderr.trim();
        if !stderr.is_empty() {
            return Err(Error::Extraction(format!(
                "{} reported: {stderr}",
                self.tool.name
            )));
        }

        parse_dump(&output.stdout, &self.upstream.media_type)
    }
}

#[derive(Debug, Deserialize)]
struct Dump {
    url: Option<String>,
    title: Option<String>,
    thumbnail: Option<String>,
    id: Option<serde_json::Value>,
    #[serde(default)]
    formats: Vec<DumpFormat>,
}

#[derive(Debug, Deserialize)]
struct DumpFormat {
    url: Option<String>,
    mime_type: Option<String>,
    ext: Option<String>,
}

/// Parse `--dump-json` output into [`ExtractedMedia`].
///
/// The locator is the top-level `url`, else the first format whose
/// `mime_type` contains `media_type`, else the first format whose `ext`
/// equals the media type's subtype.
pub fn parse_dump(stdout: &str, media_type: &str) -> Result<ExtractedMedia> {
    let dump: Dump = serde_json::from_str(stdout.trim())
        .map_err(|e| Error::Extraction(format!("unparsable extractor output: {e}")))?;

    let subtype = media_type.rsplit('/').next().unwrap_or(media_type);

    let locator = dump
        .url
        .filter(|u| !u.is_empty())
        .or_else(|| {
            dump.formats
                .iter()
                .find(|f| {
                    f.mime_type
                        .as_deref()
                        .is_some_and(|m| m.contains(media_type))
                })
                .and_then(|f| f.url.clone())
        })
        .or_else(|| {
            dump.formats
                .iter()
                .find(|f| f.mime_type.is_none() && f.ext.as_deref() == Some(subtype))
                .and_then(|f| f.url.clone())
        })
        .ok_or_else(|| Error::Extraction("no playable URL in extractor output".into()))?;

    if !(locator.starts_with("http://") || locator.starts_with("https://")) {
        return Err(Error::Extraction(format!(
            "extractor returned a non-http locator: {locator}"
        )));
    }

    let id = dump.id.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    Ok(ExtractedMedia {
        locator,
        title: dump.title,
        thumbnail: dump.thumbnail,
        id,
    })
}
