//! Facade configuration.
//!
//! Everything here is per-instance: verbosity is a config value threaded
//! through the components instead of process-wide mutable state.

use serde::{Deserialize, Serialize};

use crate::protocol::TargetDevice;

/// Configuration for a [`VolumeControl`](crate::VolumeControl) instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Device operations apply to until changed.
    #[serde(default)]
    pub device: TargetDevice,

    /// Emit informational logs for each operation. Warnings and errors
    /// are always emitted.
    #[serde(default)]
    pub verbose: bool,

    /// Kill the tool and fail the call if it runs longer than this many
    /// seconds. `None` (the default) waits indefinitely.
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            device: TargetDevice::DefaultRender,
            verbose: false,
            command_timeout_secs: None,
        }
    }
}
