//! Save and restore zram device configuration.
//!
//! zram devices are ephemeral: their compression algorithm, stream count,
//! size, and memory limit vanish on reboot. This crate captures the live
//! sysfs state of every active device into a flat INI snapshot and can
//! later re-create and reconfigure the devices to match it.
//!
//! # Example
//!
//! ```no_run
//! use zramcfg_core::{Reconciler, Registry};
//!
//! let reconciler = Reconciler::new(Registry::new(), "/etc/zram.cfg");
//! let outcome = reconciler.save(false)?;
//! # Ok::<(), zramcfg_core::Error>(())
//! ```

#![deny(missing_docs)]
#![deny(clippy::panic)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod error;

pub mod cfgfile;
pub mod hotadd;
pub mod reconcile;
pub mod registry;

pub use cfgfile::{ConfigFile, DeviceRecord, CFG_ATTRS};
pub use error::{Error, Result};
pub use hotadd::{HotAdd, RetryPolicy};
pub use reconcile::{LoadOutcome, Reconciler, SaveOutcome};
pub use registry::Registry;
