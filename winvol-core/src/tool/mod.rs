//! The external tool layer: embedded payload, on-disk extraction, and
//! subprocess execution.
//!
//! # Architecture
//!
//! - `resource`: the compiled-in tool payload
//! - `extract`: one-shot extraction to a temp file with RAII cleanup
//! - `runner`: deadlock-free subprocess execution

pub mod extract;
pub mod resource;
pub mod runner;

// Re-export commonly used types
pub use extract::ExtractedTool;
pub use resource::{bundled, ToolResource, BUNDLED_TOOL_NAME};
pub use runner::{run, CommandRequest, CommandResult};
