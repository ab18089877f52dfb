//! zramcfg - save and restore zram device configuration.
//!
//! zram devices are ephemeral, so their tunables (compression algorithm,
//! stream count, size, memory limit) must be captured before shutdown and
//! replayed at boot.
//!
//! # Usage
//!
//! ```bash
//! # Capture every active device into /etc/zram.cfg
//! zramcfg save
//!
//! # Re-create and configure devices from the snapshot
//! zramcfg load
//!
//! # Drop a stale snapshot when nothing is left to capture
//! zramcfg save --force
//! ```

#![deny(missing_docs)]
#![deny(clippy::panic)]
#![warn(clippy::all, clippy::pedantic)]

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Default location of the configuration snapshot.
const DEFAULT_CONFIG: &str = "/etc/zram.cfg";

/// zramcfg: save and restore zram device configuration
#[derive(Parser)]
#[command(name = "zramcfg")]
#[command(author, version, about, long_about = None, disable_version_flag = true)]
struct Cli {
    /// Configuration file to read or write.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Print version information.
    #[arg(
        short = 'v',
        long = "version",
        action = ArgAction::Version,
        value_parser = clap::value_parser!(bool)
    )]
    version: Option<bool>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save the configuration of all active devices
    Save(commands::SaveArgs),

    /// Re-create devices from the saved configuration
    Load(commands::LoadArgs),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Save(args) => commands::save(&cli.config, &args),
        Commands::Load(args) => commands::load(&cli.config, &args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
