//! Subprocess executor: runs one tool command with a wall-clock timeout
//! and an output-size ceiling, and sanitizes whatever comes back.
//!
//! Tool stdout is treated as untrusted even though the tool itself is
//! trusted: the target name echoed inside it is attacker-influenced.

use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::errors::ToolError;
use crate::services::registry::{Lane, ToolCommand};

/// Network scanners report an unreachable target as a successful run with
/// this phrase in the output; it is a semantic failure, not a result.
const NO_HOSTS_SENTINEL: &str = "0 hosts up";

static ANSI_ESCAPES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[0-9A-Za-z]").unwrap());

/// Seam between the orchestrator and the operating system. The production
/// implementation spawns real processes; tests substitute a stub.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run one command to completion and return its sanitized output.
    async fn run(&self, command: &ToolCommand) -> Result<String, ToolError>;
}

/// Production runner backed by `tokio::process`.
pub struct SubprocessRunner {
    timeout: Duration,
    max_output_bytes: usize,
}

impl SubprocessRunner {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_limits(
            Duration::from_secs(config.tool_timeout_secs),
            config.max_tool_output_bytes,
        )
    }

    pub fn with_limits(timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            timeout,
            max_output_bytes,
        }
    }
}

#[async_trait]
impl ToolRunner for SubprocessRunner {
    async fn run(&self, command: &ToolCommand) -> Result<String, ToolError> {
        let mut cmd = match command.lane {
            // Non-interactive sudo: fail outright rather than hang on a
            // password prompt.
            Lane::Privileged => {
                let mut c = Command::new("sudo");
                c.arg("-n").arg(command.program);
                c
            }
            Lane::Unprivileged => Command::new(command.program),
        };
        cmd.args(&command.args)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = command.program, tool = %command.tool, "Spawning tool process");
        let mut child = cmd.spawn()?;

        if let Some(input) = &command.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes()).await?;
            }
        }

        let (stdout_bytes, stderr_bytes) = match timeout(self.timeout, self.drain(&mut child)).await
        {
            Ok(Ok(captured)) => captured,
            Ok(Err(e)) => {
                // Cap exceeded or pipe error: terminate the child instead
                // of letting it run out the clock.
                let _ = child.kill().await;
                return Err(e);
            }
            Err(_) => {
                warn!(tool = %command.tool, "Tool process timed out");
                let _ = child.kill().await;
                return Err(ToolError::Timeout(self.timeout.as_secs()));
            }
        };

        let stdout = String::from_utf8_lossy(&stdout_bytes);
        let stderr = String::from_utf8_lossy(&stderr_bytes);

        if command.lane == Lane::Privileged && stderr.contains("a password is required") {
            return Err(ToolError::Privilege);
        }
        if !stderr.trim().is_empty() {
            debug!(tool = %command.tool, stderr = %stderr.trim(), "Tool stderr");
        }

        // Many of these tools write findings to stderr when stdout is empty.
        let text = if stdout.trim().is_empty() {
            stderr
        } else {
            stdout
        };

        if text.trim().is_empty() || text.contains(NO_HOSTS_SENTINEL) {
            return Err(ToolError::NoResults);
        }

        Ok(sanitize_output(&text))
    }
}

impl SubprocessRunner {
    /// Read both pipes incrementally until EOF, failing as soon as the
    /// combined byte count crosses the ceiling. The caller kills the
    /// child on failure, so a runaway tool stops at the cap instead of
    /// being buffered to completion.
    async fn drain(&self, child: &mut Child) -> Result<(Vec<u8>, Vec<u8>), ToolError> {
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut out_buf = [0u8; 8192];
        let mut err_buf = [0u8; 8192];

        while stdout_pipe.is_some() || stderr_pipe.is_some() {
            tokio::select! {
                read = read_some(&mut stdout_pipe, &mut out_buf) => match read? {
                    0 => stdout_pipe = None,
                    n => stdout.extend_from_slice(&out_buf[..n]),
                },
                read = read_some(&mut stderr_pipe, &mut err_buf) => match read? {
                    0 => stderr_pipe = None,
                    n => stderr.extend_from_slice(&err_buf[..n]),
                },
            }

            if stdout.len() + stderr.len() > self.max_output_bytes {
                return Err(ToolError::OutputTooLarge(self.max_output_bytes));
            }
        }

        child.wait().await?;
        Ok((stdout, stderr))
    }
}

/// Read one chunk from an open pipe; a closed pipe never resolves, so the
/// other branch of the select keeps making progress.
async fn read_some<R>(pipe: &mut Option<R>, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match pipe.as_mut() {
        Some(reader) => reader.read(buf).await,
        None => std::future::pending().await,
    }
}

/// Neutralize embedded markup before the output is ever displayed:
/// strip ANSI escape sequences and escape HTML-significant characters.
pub fn sanitize_output(raw: &str) -> String {
    let stripped = ANSI_ESCAPES.replace_all(raw, "");
    stripped
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
