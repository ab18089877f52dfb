//! Load command - re-create devices from the snapshot file.

use clap::Args;
use std::path::Path;
use std::time::Duration;
use zramcfg_core::{LoadOutcome, Reconciler, Registry, RetryPolicy};

/// Arguments for the load command.
#[derive(Args)]
pub struct LoadArgs {
    /// Give up on a device after this many hot-add probes (default: keep
    /// probing).
    #[arg(long)]
    pub hot_add_attempts: Option<u32>,

    /// Pause between hot-add probes, in milliseconds.
    #[arg(long, default_value = "0")]
    pub hot_add_delay_ms: u64,
}

/// Re-create and configure zram devices from the snapshot file.
pub fn load(config: &Path, args: &LoadArgs) -> anyhow::Result<()> {
    let retry = RetryPolicy {
        max_attempts: args.hot_add_attempts,
        delay: Duration::from_millis(args.hot_add_delay_ms),
    };
    let reconciler = Reconciler::new(Registry::new(), config).retry_policy(retry);

    match reconciler.load()? {
        LoadOutcome::Applied {
            configured,
            skipped,
        } => {
            println!("Configured {configured} device(s), skipped {skipped}");
        }
        LoadOutcome::NoConfig => {
            println!("Could not load configuration file {}", config.display());
        }
    }
    Ok(())
}
