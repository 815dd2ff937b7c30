//! Subprocess execution for the extracted tool.
//!
//! The tool writes diagnostics to both stdout and stderr. Every stream
//! that is not being captured inline is drained by a concurrently spawned
//! task while the main future waits for the child to exit; an unread pipe
//! buffer can fill up and deadlock the child otherwise. Drain tasks are
//! joined before a call returns.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::VolumeError;

// ============================================================================
// Request / Result
// ============================================================================

/// One subprocess invocation: the full argument vector (tool path first)
/// and whether the caller wants the first stdout line back.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub argv: Vec<String>,
    pub capture_output: bool,
    /// Optional bound on the child's runtime; the child is killed when it
    /// expires. `None` means wait indefinitely.
    pub timeout: Option<Duration>,
}

impl CommandRequest {
    /// Creates a request with no timeout.
    pub fn new(argv: Vec<String>, capture_output: bool) -> Self {
        Self {
            argv,
            capture_output,
            timeout: None,
        }
    }

    /// Adds a bound on the child's runtime.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// The command line as a single string, for logs and error reports.
    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}

/// Outcome of a completed subprocess invocation.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: i32,
    /// First stdout line, present when the request asked for capture and
    /// the tool printed anything.
    pub captured_line: Option<String>,
}

// ============================================================================
// Execution
// ============================================================================

/// Runs the tool to completion and interprets its exit code.
///
/// # Errors
///
/// Returns `ToolExecutionFailed` on a non-zero exit code, `Timeout` if the
/// configured bound expires (the child is killed first), or `Io` if the
/// process cannot be spawned.
pub async fn run(request: &CommandRequest, verbose: bool) -> Result<CommandResult, VolumeError> {
    let (program, args) = request.argv.split_first().ok_or_else(|| {
        VolumeError::InvalidArgument("empty argument vector".to_string())
    })?;

    if verbose {
        debug!("Executing: {}", request.command_line());
    }

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // An interrupted wait must not leak a live child.
        .kill_on_drop(true);

    let mut child = cmd.spawn()?;

    let mut drains: Vec<JoinHandle<()>> = Vec::new();
    if let Some(stderr) = child.stderr.take() {
        drains.push(tokio::spawn(drain_stream(stderr, "stderr")));
    }

    let stdout = child.stdout.take();
    let inline_stdout = if request.capture_output {
        stdout
    } else {
        if let Some(stdout) = stdout {
            drains.push(tokio::spawn(drain_stream(stdout, "stdout")));
        }
        None
    };

    let child_ref = &mut child;
    let wait = async move {
        let captured = match inline_stdout {
            Some(stream) => capture_first_line(stream).await,
            None => None,
        };
        let status = child_ref.wait().await?;
        Ok::<_, std::io::Error>((status, captured))
    };

    let (status, captured_line) = match request.timeout {
        Some(limit) => {
            let outcome = timeout(limit, wait).await;
            match outcome {
                Ok(result) => result?,
                Err(_) => {
                    let _ = child.kill().await;
                    for drain in drains {
                        let _ = drain.await;
                    }
                    return Err(VolumeError::Timeout {
                        seconds: limit.as_secs(),
                    });
                }
            }
        }
        None => wait.await?,
    };

    // The streams are closed once the child exits, so these finish promptly.
    for drain in drains {
        let _ = drain.await;
    }

    let exit_code = status.code().unwrap_or(-1);
    if exit_code != 0 {
        warn!(
            "Tool finished with non-zero exit code {}: {}",
            exit_code,
            request.command_line()
        );
        return Err(VolumeError::ToolExecutionFailed {
            exit_code,
            command: request.command_line(),
        });
    }

    if verbose {
        debug!("Tool finished successfully (exit code 0)");
    }

    Ok(CommandResult {
        exit_code,
        captured_line,
    })
}

// ============================================================================
// Stream Readers
// ============================================================================

/// Reads a stream to EOF, logging every line at trace level. Read errors
/// stay inside the task; they are logged and never propagate to the
/// caller's stack.
async fn drain_stream<R>(stream: R, label: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => trace!("{}> {}", label, line),
            Ok(None) => break,
            Err(e) => {
                warn!("Error reading {} stream: {}", label, e);
                break;
            }
        }
    }
}

/// Reads stdout to EOF, keeping the first line and logging the rest at
/// trace level. Reading the whole stream matters: stopping at the first
/// line would let the pipe buffer fill and stall the child.
async fn capture_first_line<R>(stream: R) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut first = None;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if first.is_none() {
                    first = Some(line);
                } else {
                    trace!("stdout> {}", line);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Error reading stdout stream: {}", e);
                break;
            }
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str, capture: bool) -> CommandRequest {
        CommandRequest::new(
            vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()],
            capture,
        )
    }

    #[tokio::test]
    async fn test_empty_argv_is_invalid() {
        let request = CommandRequest::new(vec![], false);
        let err = run(&request, false).await.unwrap_err();
        assert!(matches!(err, VolumeError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let request = CommandRequest::new(vec!["/nonexistent/tool".to_string()], false);
        let err = run(&request, false).await.unwrap_err();
        assert!(matches!(err, VolumeError::Io(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_first_line_only() {
        let result = run(&sh("echo 42; echo extra", true), false).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.captured_line.as_deref(), Some("42"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_no_capture_discards_output() {
        let result = run(&sh("echo ignored", false), false).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert!(result.captured_line.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_execution_failure() {
        let err = run(&sh("exit 2", false), false).await.unwrap_err();
        match err {
            VolumeError::ToolExecutionFailed { exit_code, command } => {
                assert_eq!(exit_code, 2);
                assert!(command.contains("exit 2"));
            }
            other => panic!("Unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_large_output_on_both_streams_does_not_deadlock() {
        // 100KB to stdout and stderr each; without concurrent draining
        // the pipe buffers fill and the child never exits.
        let script = "head -c 100000 /dev/zero | tr '\\0' x; \
                      head -c 100000 /dev/zero | tr '\\0' x 1>&2";

        let result = run(&sh(script, false), false).await.unwrap();
        assert_eq!(result.exit_code, 0);

        // Same with the capture path, which reads stdout inline.
        let result = run(&sh(script, true), false).await.unwrap();
        assert_eq!(result.captured_line.map(|l| l.len()), Some(100000));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_child() {
        let request = sh("sleep 30", false).with_timeout(Duration::from_millis(200));
        let err = run(&request, false).await.unwrap_err();
        assert!(matches!(err, VolumeError::Timeout { .. }));
    }
}
