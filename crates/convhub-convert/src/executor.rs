//! External tool execution for media conversions.
//!
//! Runs conversion tools (ffmpeg) as child processes with timeout
//! management and stderr capture. Children are spawned with
//! `kill_on_drop`, so dropping the future (e.g. an outer timeout) also
//! kills the process.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::error::ConversionError;

/// Maximum stderr characters kept in errors.
const STDERR_LIMIT: usize = 2000;

/// Parameters for executing a tool
#[derive(Debug, Clone)]
pub struct ExecutionParams {
    /// Tool name for logs and errors
    pub tool: String,
    /// Resolved executable path
    pub program: PathBuf,
    /// Arguments (after placeholder substitution)
    pub args: Vec<String>,
    /// Timeout in seconds
    pub timeout_seconds: u64,
    /// Path where output should be written
    pub output_path: PathBuf,
}

/// Executor for running external conversion commands
#[derive(Debug, Clone, Default)]
pub struct ConversionExecutor;

impl ConversionExecutor {
    /// Create a new executor
    pub fn new() -> Self {
        Self
    }

    /// Substitute `{input}` and `{output}` placeholders in an argument template
    pub fn substitute_args(template: &[&str], input_path: &Path, output_path: &Path) -> Vec<String> {
        let input_str = input_path.to_string_lossy();
        let output_str = output_path.to_string_lossy();

        template
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input_str)
                    .replace("{output}", &output_str)
            })
            .collect()
    }

    /// Execute a tool and wait for it, bounded by `params.timeout_seconds`
    pub async fn execute(&self, params: &ExecutionParams) -> Result<(), ConversionError> {
        let start = Instant::now();

        tracing::debug!(
            tool = %params.tool,
            program = %params.program.display(),
            args = ?params.args,
            "Spawning conversion tool"
        );

        let mut cmd = Command::new(&params.program);
        cmd.args(&params.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let timeout = Duration::from_secs(params.timeout_seconds);
        let result = tokio::time::timeout(timeout, cmd.output()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    let code = output.status.code().unwrap_or(-1);
                    tracing::error!(
                        tool = %params.tool,
                        exit_code = code,
                        stderr = %stderr.chars().take(500).collect::<String>(),
                        "Conversion tool failed"
                    );
                    return Err(ConversionError::ToolFailed {
                        tool: params.tool.clone(),
                        code,
                        stderr: stderr.trim().chars().take(STDERR_LIMIT).collect(),
                    });
                }

                let output_size = tokio::fs::metadata(&params.output_path)
                    .await
                    .ok()
                    .map(|m| m.len());

                tracing::debug!(
                    tool = %params.tool,
                    duration_ms,
                    output_size = ?output_size,
                    "Conversion tool completed"
                );
                Ok(())
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ConversionError::ToolNotFound {
                    tool: params.tool.clone(),
                })
            }
            Ok(Err(e)) => {
                tracing::error!(tool = %params.tool, error = %e, "Failed to execute conversion tool");
                Err(ConversionError::Io(e))
            }
            Err(_) => {
                tracing::error!(
                    tool = %params.tool,
                    timeout_s = params.timeout_seconds,
                    "Conversion tool timed out, killing"
                );
                Err(ConversionError::TimedOut {
                    timeout_seconds: params.timeout_seconds,
                })
            }
        }
    }
}
