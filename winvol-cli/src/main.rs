//! winvol command-line front end.
//!
//! Thin clap wrapper over the `VolumeControl` facade.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use winvol_core::{ControlConfig, TargetDevice, VolumeControl};

#[derive(Parser, Debug)]
#[command(name = "winvol", version)]
#[command(about = "Control the Windows system volume via the bundled NirCmd utility")]
struct Args {
    /// Target audio device: default, speakers or headphones.
    #[arg(long, default_value = "default")]
    device: TargetDevice,

    /// Log each operation as it runs.
    #[arg(long)]
    verbose: bool,

    /// Kill the tool if it runs longer than this many seconds.
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Set the volume to a percentage (0-100).
    Set { percent: u8 },
    /// Raise the volume by a percentage step.
    Up { step: u8 },
    /// Lower the volume by a percentage step.
    Down { step: u8 },
    /// Mute the target device.
    Mute,
    /// Unmute the target device.
    Unmute,
    /// Toggle the mute state.
    Toggle,
    /// Print the current volume percentage.
    Get {
        /// Print the answer as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print whether the target device is muted.
    Muted {
        /// Print the answer as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; --verbose raises the default level so the
    // facade's per-operation logs become visible.
    let default_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .init();

    tracing::debug!("winvol v{}", winvol_core::VERSION);

    let config = ControlConfig {
        device: args.device,
        verbose: args.verbose,
        command_timeout_secs: args.timeout,
    };
    let control =
        VolumeControl::with_config(config).context("failed to initialize volume control")?;

    match args.command {
        CliCommand::Set { percent } => control.set_volume(percent).await?,
        CliCommand::Up { step } => control.increase_volume(step).await?,
        CliCommand::Down { step } => control.decrease_volume(step).await?,
        CliCommand::Mute => control.mute().await?,
        CliCommand::Unmute => control.unmute().await?,
        CliCommand::Toggle => control.toggle_mute().await?,
        CliCommand::Get { json } => {
            let volume = control.get_volume().await?;
            if json {
                println!("{}", serde_json::json!({ "volume": volume }));
            } else {
                println!("{}", volume);
            }
        }
        CliCommand::Muted { json } => {
            let muted = control.is_muted().await?;
            if json {
                println!("{}", serde_json::json!({ "muted": muted }));
            } else {
                println!("{}", muted);
            }
        }
    }

    Ok(())
}
