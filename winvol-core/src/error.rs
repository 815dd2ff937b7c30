//! Error types for volume-control operations.

use thiserror::Error;

/// Errors that can occur while controlling the system volume.
///
/// Construction-time failures (`ResourceMissing`) are fatal: no facade
/// instance exists afterwards. Every other variant is local to the call
/// that produced it and leaves the facade fully usable.
#[derive(Debug, Error)]
pub enum VolumeError {
    /// The bundled tool payload is absent from this build.
    #[error("embedded tool '{name}' is missing from this build")]
    ResourceMissing { name: String },

    /// The extracted tool is no longer available on disk.
    #[error("extracted tool is no longer available at {path}")]
    NotReady { path: String },

    /// Caller input is outside the operation's contract. No subprocess
    /// call is attempted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The tool process exited with a non-zero code.
    #[error("tool exited with code {exit_code}: {command}")]
    ToolExecutionFailed { exit_code: i32, command: String },

    /// A query's captured output line was not in the expected format.
    #[error("unparseable tool output: {line:?}")]
    OutputUnparseable { line: String },

    /// The tool did not finish within the configured bound and was killed.
    #[error("tool timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
