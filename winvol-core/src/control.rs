//! The volume-control facade.
//!
//! `VolumeControl` owns the extracted tool for its whole lifetime.
//! Construction extracts the bundled binary eagerly; a construction error
//! means no instance exists and there is nothing to retry. Per-call
//! failures are typed and leave the facade fully usable.

use std::path::Path;
use std::time::Duration;

use tracing::{error, info};

use crate::config::ControlConfig;
use crate::error::VolumeError;
use crate::protocol::{self, MuteAction, TargetDevice, VolumeCommand};
use crate::tool::{resource, runner, CommandRequest, CommandResult, ExtractedTool, ToolResource};

// ============================================================================
// Volume Control
// ============================================================================

/// Controls the Windows system volume through the bundled NirCmd utility.
///
/// Operations are async but logically blocking: each call awaits the
/// child process's exit before returning.
#[derive(Debug)]
pub struct VolumeControl {
    tool: ExtractedTool,
    device: TargetDevice,
    verbose: bool,
    command_timeout: Option<Duration>,
}

impl VolumeControl {
    /// Creates a facade with the bundled tool and default configuration.
    ///
    /// # Errors
    ///
    /// Returns `ResourceMissing` if the tool binary was not vendored into
    /// this build, or an IO error if extraction fails. Either way no
    /// instance exists afterwards; no volume operation can proceed.
    pub fn new() -> Result<Self, VolumeError> {
        Self::with_config(ControlConfig::default())
    }

    /// Creates a facade with the bundled tool and the given configuration.
    pub fn with_config(config: ControlConfig) -> Result<Self, VolumeError> {
        Self::from_resource(&resource::bundled(), config)
    }

    /// Creates a facade around an arbitrary tool payload.
    ///
    /// This is the seam tests use to substitute a cooperative fake tool.
    pub fn from_resource(
        resource: &ToolResource<'_>,
        config: ControlConfig,
    ) -> Result<Self, VolumeError> {
        let tool = ExtractedTool::extract(resource, config.verbose)?;

        Ok(Self {
            tool,
            device: config.device,
            verbose: config.verbose,
            command_timeout: config.command_timeout_secs.map(Duration::from_secs),
        })
    }

    // ========================================================================
    // Configuration Surface
    // ========================================================================

    /// The device subsequent operations apply to.
    pub fn target_device(&self) -> TargetDevice {
        self.device
    }

    /// Selects the device subsequent operations apply to.
    pub fn set_target_device(&mut self, device: TargetDevice) {
        self.device = device;
    }

    /// Enables informational logging for each operation.
    pub fn enable_logging(&mut self) {
        self.verbose = true;
    }

    /// Disables informational logging. Warnings and errors still emit.
    pub fn disable_logging(&mut self) {
        self.verbose = false;
    }

    /// Path of the extracted tool executable.
    pub fn tool_path(&self) -> &Path {
        self.tool.path()
    }

    // ========================================================================
    // Mutating Operations
    // ========================================================================

    /// Sets the volume to a percentage (0-100).
    pub async fn set_volume(&self, percent: u8) -> Result<(), VolumeError> {
        check_percentage(percent)?;
        self.execute(VolumeCommand::SetVolume { percent }).await?;
        if self.verbose {
            info!("System volume set to {}% on {}", percent, self.device);
        }
        Ok(())
    }

    /// Raises the volume by a percentage step.
    pub async fn increase_volume(&self, step: u8) -> Result<(), VolumeError> {
        check_percentage(step)?;
        self.execute(VolumeCommand::IncreaseVolume { step }).await?;
        if self.verbose {
            info!("System volume increased by {}% on {}", step, self.device);
        }
        Ok(())
    }

    /// Lowers the volume by a percentage step.
    pub async fn decrease_volume(&self, step: u8) -> Result<(), VolumeError> {
        check_percentage(step)?;
        self.execute(VolumeCommand::DecreaseVolume { step }).await?;
        if self.verbose {
            info!("System volume decreased by {}% on {}", step, self.device);
        }
        Ok(())
    }

    /// Mutes the target device.
    pub async fn mute(&self) -> Result<(), VolumeError> {
        self.execute(VolumeCommand::SetMute(MuteAction::Mute)).await?;
        if self.verbose {
            info!("System volume muted on {}", self.device);
        }
        Ok(())
    }

    /// Unmutes the target device.
    pub async fn unmute(&self) -> Result<(), VolumeError> {
        self.execute(VolumeCommand::SetMute(MuteAction::Unmute))
            .await?;
        if self.verbose {
            info!("System volume unmuted on {}", self.device);
        }
        Ok(())
    }

    /// Toggles the mute state of the target device.
    pub async fn toggle_mute(&self) -> Result<(), VolumeError> {
        self.execute(VolumeCommand::SetMute(MuteAction::Toggle))
            .await?;
        if self.verbose {
            info!("System volume mute toggled on {}", self.device);
        }
        Ok(())
    }

    // ========================================================================
    // Query Operations
    // ========================================================================

    /// Returns the current volume as a percentage (0-100).
    ///
    /// On a tool or parse failure this logs at error level and returns
    /// the typed failure (`ToolExecutionFailed` or `OutputUnparseable`);
    /// the raw cause never escapes as a panic.
    pub async fn get_volume(&self) -> Result<u8, VolumeError> {
        let result = match self.execute(VolumeCommand::GetVolume).await {
            Ok(result) => result,
            Err(e) => {
                error!("Volume query failed: {}", e);
                return Err(e);
            }
        };

        let line = result.captured_line.unwrap_or_default();
        match protocol::parse_volume_line(&line) {
            Some(percent) => Ok(percent),
            None => {
                let err = VolumeError::OutputUnparseable { line };
                error!("Volume query returned unexpected output: {}", err);
                Err(err)
            }
        }
    }

    /// Returns true if the target device is muted.
    ///
    /// Failure behavior matches [`get_volume`](Self::get_volume).
    pub async fn is_muted(&self) -> Result<bool, VolumeError> {
        let result = match self.execute(VolumeCommand::GetMuteState).await {
            Ok(result) => result,
            Err(e) => {
                error!("Mute query failed: {}", e);
                return Err(e);
            }
        };

        match result.captured_line {
            Some(line) => Ok(protocol::parse_mute_line(&line)),
            None => {
                let err = VolumeError::OutputUnparseable {
                    line: String::new(),
                };
                error!("Mute query returned no output");
                Err(err)
            }
        }
    }

    // ========================================================================
    // Execution
    // ========================================================================

    async fn execute(&self, command: VolumeCommand) -> Result<CommandResult, VolumeError> {
        if !self.tool.is_available() {
            return Err(VolumeError::NotReady {
                path: self.tool.path().display().to_string(),
            });
        }

        let mut argv = Vec::with_capacity(4);
        argv.push(self.tool.path().to_string_lossy().into_owned());
        argv.extend(command.args(self.device));

        let mut request = CommandRequest::new(argv, command.captures_output());
        if let Some(limit) = self.command_timeout {
            request = request.with_timeout(limit);
        }

        runner::run(&request, self.verbose).await
    }
}

/// Rejects percentages and steps outside 0-100 before any command is built.
fn check_percentage(value: u8) -> Result<(), VolumeError> {
    if value > 100 {
        return Err(VolumeError::InvalidArgument(format!(
            "percentage must be between 0 and 100, got {}",
            value
        )));
    }
    Ok(())
}
