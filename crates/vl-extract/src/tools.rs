//! External tool detection.
//!
//! The [`ToolRegistry`] discovers the configured extractor program and
//! provides the startup check that it is present and answers `--version`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vl_core::config::ExtractorConfig;
use vl_core::{Error, Result};

use crate::command::ToolCommand;

/// Timeout for `--version` probes.
const VERSION_TIMEOUT: Duration = Duration::from_secs(15);

/// A located external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Human-readable tool name (e.g. "yt-dlp").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
    /// Arguments placed before every generated argument list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `--version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding the discovered extractor.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    wanted: String,
    extractor: Option<ToolConfig>,
}

impl ToolRegistry {
    /// Locate the extractor named by `config.program`.
    ///
    /// A program given as a path is used directly when it exists; a bare
    /// name is searched for on `PATH` with [`which::which`].
    pub fn discover(config: &ExtractorConfig) -> Self {
        let program = config.program.trim();
        let as_path = Path::new(program);

        let resolved = if as_path.components().count() > 1 {
            as_path.exists().then(|| as_path.to_path_buf())
        } else {
            which::which(program).ok()
        };

        if resolved.is_none() {
            tracing::warn!(program, "extractor not found");
        }

        Self {
            wanted: program.to_string(),
            extractor: resolved.map(|path| ToolConfig {
                name: tool_name(program),
                path,
                args: config.args.clone(),
            }),
        }
    }

    /// Return the extractor, or an [`Error::Tool`] if discovery failed.
    pub fn require_extractor(&self) -> Result<&ToolConfig> {
        self.extractor.as_ref().ok_or_else(|| {
            Error::tool(
                &self.wanted,
                format!("{} not found; is it installed and in PATH?", self.wanted),
            )
        })
    }

    /// Run `<extractor> [args..] --version` and return the first stdout line.
    ///
    /// Used at startup: a missing or silent extractor is fatal.
    pub async fn verify_extractor(&self) -> Result<String> {
        let tool = self.require_extractor()?;
        let output = ToolCommand::new(tool.path.clone())
            .args(tool.args.iter().cloned())
            .arg("--version")
            .timeout(VERSION_TIMEOUT)
            .execute()
            .await?;

        output
            .stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::tool(&tool.name, "--version printed nothing"))
    }

    /// Report extractor availability.
    pub async fn check_all(&self) -> Vec<ToolInfo> {
        let info = match &self.extractor {
            Some(tool) => ToolInfo {
                name: tool.name.clone(),
                available: true,
                version: self.verify_extractor().await.ok(),
                path: Some(tool.path.clone()),
            },
            None => ToolInfo {
                name: tool_name(&self.wanted),
                available: false,
                version: None,
                path: None,
            },
        };
        vec![info]
    }

    /// Name of the configured extractor, found or not.
    pub fn extractor_name(&self) -> String {
        tool_name(&self.wanted)
    }
}

fn tool_name(program: &str) -> String {
    Path::new(program)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(program: &str, args: &[&str]) -> ExtractorConfig {
        ExtractorConfig {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
            ..ExtractorConfig::default()
        }
    }

    #[test]
    fn missing_extractor_is_tool_error() {
        let registry = ToolRegistry::discover(&config("nonexistent_tool_xyz", &[]));
        let err = registry.require_extractor().unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
        assert!(err.to_string().contains("nonexistent_tool_xyz"));
    }

    #[test]
    fn missing_absolute_path_is_not_found() {
        let registry = ToolRegistry::discover(&config("/nonexistent/bin/yt-dlp", &[]));
        assert!(registry.require_extractor().is_err());
        assert_eq!(registry.extractor_name(), "yt-dlp");
    }

    #[tokio::test]
    async fn check_all_reports_unavailable() {
        let registry = ToolRegistry::discover(&config("nonexistent_tool_xyz", &[]));
        let infos = registry.check_all().await;
        assert_eq!(infos.len(), 1);
        assert!(!infos[0].available);
        assert!(infos[0].version.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn verify_reads_first_line() {
        let registry = ToolRegistry::discover(&config(
            "sh",
            &["-c", "printf '\\n2024.10.07\\nextra\\n'", "sh"],
        ));
        assert_eq!(registry.verify_extractor().await.unwrap(), "2024.10.07");

        let infos = registry.check_all().await;
        assert!(infos[0].available);
        assert_eq!(infos[0].version.as_deref(), Some("2024.10.07"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_extractor_fails_verification() {
        let registry = ToolRegistry::discover(&config("sh", &["-c", "true", "sh"]));
        assert!(registry.verify_extractor().await.is_err());
    }
}
