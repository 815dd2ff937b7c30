//! The NirCmd command protocol.
//!
//! Pure mapping between facade operations and the argument vectors the
//! external tool expects, plus the parsing rules for the one-line answers
//! that query commands print on stdout. No I/O happens here.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Protocol Constants
// ============================================================================

/// The tool's native volume ceiling. Percentages are scaled onto
/// `0..=NATIVE_VOLUME_MAX` before being handed to the tool. Must match the
/// range the shipped tool actually uses; keep it in this one place.
pub const NATIVE_VOLUME_MAX: u32 = 65535;

/// Command word for setting the volume to an absolute native value.
pub const CMD_SET_VOLUME: &str = "setsysvolume";

/// Command word for changing the volume by a signed native delta.
pub const CMD_CHANGE_VOLUME: &str = "changesysvolume";

/// Command word for setting the mute state (0 = unmute, 1 = mute, 2 = toggle).
pub const CMD_SET_MUTE: &str = "mutesysvolume";

/// Command word for querying the current volume (native units, first stdout line).
pub const CMD_GET_VOLUME: &str = "getsysvolume";

/// Command word for querying the mute state (first stdout line).
pub const CMD_GET_MUTE: &str = "getsysmute";

/// The token the mute query prints when the device is muted.
pub const MUTE_TRUE_TOKEN: &str = "1";

// ============================================================================
// Target Device
// ============================================================================

/// The logical audio output device an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetDevice {
    /// The default render device.
    #[default]
    DefaultRender,
    /// The speakers output.
    Speakers,
    /// The headphones output.
    Headphones,
}

impl TargetDevice {
    /// Returns all selectable devices.
    pub fn all() -> &'static [TargetDevice] {
        &[Self::DefaultRender, Self::Speakers, Self::Headphones]
    }

    /// Returns the protocol token for this device.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DefaultRender => "default",
            Self::Speakers => "speakers",
            Self::Headphones => "headphones",
        }
    }
}

impl fmt::Display for TargetDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TargetDevice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" | "default_render" | "default-render" => Ok(Self::DefaultRender),
            "speakers" => Ok(Self::Speakers),
            "headphones" => Ok(Self::Headphones),
            _ => Err(format!("Unknown device: {}", s)),
        }
    }
}

// ============================================================================
// Mute Actions
// ============================================================================

/// The three mute sub-operations the tool's mute command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteAction {
    Unmute,
    Mute,
    Toggle,
}

impl MuteAction {
    /// Returns the numeric argument the mute command expects.
    pub fn protocol_arg(&self) -> &'static str {
        match self {
            Self::Unmute => "0",
            Self::Mute => "1",
            Self::Toggle => "2",
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// A single operation against the tool, ready to be rendered into an
/// argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeCommand {
    /// Set the volume to an absolute percentage (0-100).
    SetVolume { percent: u8 },
    /// Raise the volume by a percentage step.
    IncreaseVolume { step: u8 },
    /// Lower the volume by a percentage step.
    DecreaseVolume { step: u8 },
    /// Change the mute state.
    SetMute(MuteAction),
    /// Query the current volume.
    GetVolume,
    /// Query the current mute state.
    GetMuteState,
}

impl VolumeCommand {
    /// Renders the operation's arguments for the given device. The tool
    /// path itself is prepended by the caller.
    pub fn args(&self, device: TargetDevice) -> Vec<String> {
        match self {
            Self::SetVolume { percent } => vec![
                CMD_SET_VOLUME.to_string(),
                device.as_str().to_string(),
                scaled_value(*percent).to_string(),
            ],
            Self::IncreaseVolume { step } => vec![
                CMD_CHANGE_VOLUME.to_string(),
                device.as_str().to_string(),
                format!("+{}", scaled_value(*step)),
            ],
            Self::DecreaseVolume { step } => vec![
                CMD_CHANGE_VOLUME.to_string(),
                device.as_str().to_string(),
                format!("-{}", scaled_value(*step)),
            ],
            Self::SetMute(action) => vec![
                CMD_SET_MUTE.to_string(),
                device.as_str().to_string(),
                action.protocol_arg().to_string(),
            ],
            Self::GetVolume => vec![CMD_GET_VOLUME.to_string(), device.as_str().to_string()],
            Self::GetMuteState => vec![CMD_GET_MUTE.to_string(), device.as_str().to_string()],
        }
    }

    /// Returns true if the command's answer must be captured from stdout.
    pub fn captures_output(&self) -> bool {
        matches!(self, Self::GetVolume | Self::GetMuteState)
    }
}

// ============================================================================
// Scaling & Parsing
// ============================================================================

/// Converts a 0-100 percentage into the tool's native volume units.
pub fn scaled_value(percent: u8) -> u32 {
    ((percent as f64 / 100.0) * NATIVE_VOLUME_MAX as f64).round() as u32
}

/// Parses a volume-query answer line: an integer in native units, scaled
/// back to a 0-100 percentage and clamped into range.
///
/// Returns `None` if the line is not an integer.
pub fn parse_volume_line(line: &str) -> Option<u8> {
    let native: i64 = line.trim().parse().ok()?;
    let native = native.clamp(0, NATIVE_VOLUME_MAX as i64);
    Some(((native as f64 / NATIVE_VOLUME_MAX as f64) * 100.0).round() as u8)
}

/// Parses a mute-query answer line.
pub fn parse_mute_line(line: &str) -> bool {
    line.trim() == MUTE_TRUE_TOKEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_as_str() {
        assert_eq!(TargetDevice::DefaultRender.as_str(), "default");
        assert_eq!(TargetDevice::Speakers.as_str(), "speakers");
        assert_eq!(TargetDevice::Headphones.as_str(), "headphones");
    }

    #[test]
    fn test_device_from_str() {
        assert_eq!(
            "default".parse::<TargetDevice>().unwrap(),
            TargetDevice::DefaultRender
        );
        assert_eq!(
            "default-render".parse::<TargetDevice>().unwrap(),
            TargetDevice::DefaultRender
        );
        assert_eq!(
            "Speakers".parse::<TargetDevice>().unwrap(),
            TargetDevice::Speakers
        );
        assert_eq!(
            "headphones".parse::<TargetDevice>().unwrap(),
            TargetDevice::Headphones
        );
        assert!("hdmi".parse::<TargetDevice>().is_err());
    }

    #[test]
    fn test_device_default() {
        assert_eq!(TargetDevice::default(), TargetDevice::DefaultRender);
        assert_eq!(TargetDevice::all().len(), 3);
    }

    #[test]
    fn test_scaled_value_edges() {
        assert_eq!(scaled_value(0), 0);
        assert_eq!(scaled_value(50), 32768);
        assert_eq!(scaled_value(100), 65535);
    }

    #[test]
    fn test_set_volume_args() {
        let cmd = VolumeCommand::SetVolume { percent: 100 };
        assert_eq!(
            cmd.args(TargetDevice::DefaultRender),
            vec!["setsysvolume", "default", "65535"]
        );
        assert!(!cmd.captures_output());
    }

    #[test]
    fn test_change_volume_args_are_signed() {
        let up = VolumeCommand::IncreaseVolume { step: 10 };
        assert_eq!(
            up.args(TargetDevice::Speakers),
            vec!["changesysvolume", "speakers", "+6554"]
        );

        let down = VolumeCommand::DecreaseVolume { step: 10 };
        assert_eq!(
            down.args(TargetDevice::Speakers),
            vec!["changesysvolume", "speakers", "-6554"]
        );
    }

    #[test]
    fn test_mute_args() {
        assert_eq!(
            VolumeCommand::SetMute(MuteAction::Mute).args(TargetDevice::DefaultRender),
            vec!["mutesysvolume", "default", "1"]
        );
        assert_eq!(
            VolumeCommand::SetMute(MuteAction::Unmute).args(TargetDevice::DefaultRender),
            vec!["mutesysvolume", "default", "0"]
        );
        assert_eq!(
            VolumeCommand::SetMute(MuteAction::Toggle).args(TargetDevice::DefaultRender),
            vec!["mutesysvolume", "default", "2"]
        );
    }

    #[test]
    fn test_query_args_capture() {
        let vol = VolumeCommand::GetVolume;
        assert_eq!(
            vol.args(TargetDevice::Headphones),
            vec!["getsysvolume", "headphones"]
        );
        assert!(vol.captures_output());

        let mute = VolumeCommand::GetMuteState;
        assert_eq!(
            mute.args(TargetDevice::Headphones),
            vec!["getsysmute", "headphones"]
        );
        assert!(mute.captures_output());
    }

    #[test]
    fn test_parse_volume_line() {
        assert_eq!(parse_volume_line("0"), Some(0));
        assert_eq!(parse_volume_line("65535"), Some(100));
        assert_eq!(parse_volume_line("32768"), Some(50));
        assert_eq!(parse_volume_line("  24248\n"), Some(37));
        assert_eq!(parse_volume_line("not a number"), None);
        assert_eq!(parse_volume_line(""), None);
    }

    #[test]
    fn test_parse_volume_line_clamps() {
        // A tool with a different native ceiling misscales but can never
        // produce an out-of-range percentage.
        assert_eq!(parse_volume_line("999999"), Some(100));
        assert_eq!(parse_volume_line("-5"), Some(0));
    }

    #[test]
    fn test_parse_mute_line() {
        assert!(parse_mute_line("1"));
        assert!(parse_mute_line(" 1 "));
        assert!(!parse_mute_line("0"));
        assert!(!parse_mute_line("true"));
        assert!(!parse_mute_line(""));
    }

    #[test]
    fn test_round_trip_scaling() {
        for percent in [0u8, 1, 25, 37, 50, 75, 99, 100] {
            let native = scaled_value(percent);
            assert_eq!(parse_volume_line(&native.to_string()), Some(percent));
        }
    }
}
