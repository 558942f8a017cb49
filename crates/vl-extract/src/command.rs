//! Running the extractor as a child process.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;
use vl_core::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// What a finished child printed. Both streams are decoded lossily.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// One invocation of an external program: path, argv and a wall-clock
/// limit.
///
/// The child gets a null stdin and is killed if the future driving it is
/// dropped, so a timed-out or abandoned extraction does not linger.
///
/// ```no_run
/// use std::path::PathBuf;
/// use vl_extract::ToolCommand;
///
/// # async fn dump() -> vl_core::Result<()> {
/// let dump = ToolCommand::new(PathBuf::from("yt-dlp"))
///     .args(["--dump-json", "https://www.tiktok.com/@someone/video/1"])
///     .execute()
///     .await?;
/// assert!(dump.stdout.starts_with('{'));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self.args.push(arg.into());
        }
        self
    }

    /// Kill the child if it has not exited after `limit`.
    pub fn timeout(&mut self, limit: Duration) -> &mut Self {
        self.timeout = limit;
        self
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Label used in errors and logs: the program's file name.
    fn label(&self) -> String {
        match self.program.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => self.program.display().to_string(),
        }
    }

    /// Run to completion and collect both output streams.
    ///
    /// A spawn failure, an elapsed timeout and a non-zero exit all come back
    /// as [`Error::Tool`]; the last one quotes stderr.
    pub async fn execute(&self) -> Result<ToolOutput> {
        let tool = self.label();

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::tool(&tool, format!("failed to spawn: {e}")))?;

        tracing::debug!(tool = %tool, args = ?self.args, "spawned");

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(Error::tool(tool, format!("I/O error waiting for process: {e}")));
            }
            // The future owning the child is dropped here, which kills it.
            Err(_elapsed) => {
                return Err(Error::tool(tool, format!("timed out after {:?}", self.timeout)));
            }
        };

        let captured = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if output.status.success() {
            Ok(captured)
        } else {
            let reason = captured.stderr.trim();
            Err(Error::tool(tool, format!("{} ({reason})", captured.status)))
        }
    }
}
