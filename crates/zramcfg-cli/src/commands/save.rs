//! Save command - capture live device state into the snapshot file.

use clap::Args;
use std::path::Path;
use zramcfg_core::{Reconciler, Registry, SaveOutcome};

/// Arguments for the save command.
#[derive(Args)]
pub struct SaveArgs {
    /// Remove the configuration file when no device state was captured.
    #[arg(short, long)]
    pub force: bool,
}

/// Save the configuration of every active zram device.
pub fn save(config: &Path, args: &SaveArgs) -> anyhow::Result<()> {
    let reconciler = Reconciler::new(Registry::new(), config);

    match reconciler.save(args.force)? {
        SaveOutcome::Saved(count) => {
            println!(
                "Saved configuration for {count} device(s) to {}",
                config.display()
            );
        }
        SaveOutcome::ControlMissing => {
            println!("zram-control not present, nothing to save");
        }
        SaveOutcome::NoActiveDevices => {
            println!("No active zram devices, nothing to save");
        }
    }
    Ok(())
}
