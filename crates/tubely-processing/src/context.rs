//! Execution context for external media tools.

use anyhow::{anyhow, Result};
use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation token for the external processes run on behalf
/// of one request.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    deadline: Duration,
    cancel: CancellationToken,
}

impl ExecutionContext {
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            cancel: CancellationToken::new(),
        }
    }

    /// Context cancelled whenever `parent` is, e.g. on server shutdown.
    pub fn with_parent(deadline: Duration, parent: &CancellationToken) -> Self {
        Self {
            deadline,
            cancel: parent.child_token(),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ToolError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exceeded deadline of {deadline:?}")]
    TimedOut { program: String, deadline: Duration },

    #[error("{program} cancelled")]
    Cancelled { program: String },
}

/// Run `command` to completion under `ctx`.
///
/// The child is killed when the deadline passes, when the token is cancelled,
/// or when the returned future is dropped.
pub(crate) async fn run_tool(
    mut command: Command,
    ctx: &ExecutionContext,
) -> Result<Output, ToolError> {
    let program = command
        .as_std()
        .get_program()
        .to_string_lossy()
        .into_owned();

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|source| ToolError::Spawn {
        program: program.clone(),
        source,
    })?;

    tokio::select! {
        output = child.wait_with_output() => output.map_err(|source| ToolError::Wait {
            program: program.clone(),
            source,
        }),
        _ = tokio::time::sleep(ctx.deadline) => {
            tracing::warn!(program = %program, deadline_ms = ctx.deadline.as_millis() as u64, "External tool timed out");
            Err(ToolError::TimedOut { program, deadline: ctx.deadline })
        }
        _ = ctx.cancel.cancelled() => {
            tracing::debug!(program = %program, "External tool cancelled");
            Err(ToolError::Cancelled { program })
        }
    }
}

/// Reject tool paths containing shell metacharacters or traversal.
pub(crate) fn validate_tool_path(path: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.is_empty() || path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Tool path contains dangerous characters: {}", path));
    }

    if path.contains("..") {
        return Err(anyhow!("Tool path contains directory traversal: {}", path));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tool_path() {
        assert!(validate_tool_path("ffprobe").is_ok());
        assert!(validate_tool_path("/usr/local/bin/ffmpeg").is_ok());
        assert!(validate_tool_path("ffmpeg; rm -rf /").is_err());
        assert!(validate_tool_path("../ffmpeg").is_err());
        assert!(validate_tool_path("").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_collects_output() {
        let mut command = Command::new("sh");
        command.args(["-c", "printf hello"]);

        let output = run_tool(command, &ExecutionContext::new(Duration::from_secs(10)))
            .await
            .unwrap();

        assert!(output.status.success());
        assert_eq!(output.stdout, b"hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_enforces_deadline() {
        let mut command = Command::new("sleep");
        command.arg("30");

        let start = std::time::Instant::now();
        let err = run_tool(command, &ExecutionContext::new(Duration::from_millis(100)))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::TimedOut { .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_observes_parent_cancellation() {
        let shutdown = CancellationToken::new();
        let ctx = ExecutionContext::with_parent(Duration::from_secs(30), &shutdown);
        shutdown.cancel();

        let mut command = Command::new("sleep");
        command.arg("30");
        let err = run_tool(command, &ctx).await.unwrap_err();

        assert!(matches!(err, ToolError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let command = Command::new("tubely-no-such-binary");
        let err = run_tool(command, &ExecutionContext::new(Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }
}
