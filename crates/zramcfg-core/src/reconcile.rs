//! Save/load reconciliation between live devices and the snapshot file.

use crate::cfgfile::{ConfigFile, DeviceRecord};
use crate::hotadd::{HotAdd, RetryPolicy};
use crate::registry::{parse_device_name, Registry};
use crate::{Error, Result};
use std::path::PathBuf;

/// Outcome of a save run. All variants are benign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Snapshot written for this many devices.
    Saved(usize),
    /// Control interface absent; nothing to capture.
    ControlMissing,
    /// No device was active; nothing to capture.
    NoActiveDevices,
}

/// Outcome of a load run. All variants are benign; fatal conditions are
/// reported through [`Error`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Run completed.
    Applied {
        /// Devices that received configuration writes.
        configured: usize,
        /// Sections skipped: malformed names, absent devices, already
        /// active devices.
        skipped: usize,
    },
    /// Snapshot missing, unreadable, or empty.
    NoConfig,
}

/// Drives the registry and the snapshot file in either direction.
#[derive(Debug)]
pub struct Reconciler {
    registry: Registry,
    config: ConfigFile,
    retry: RetryPolicy,
}

impl Reconciler {
    /// Reconciler over the given registry and snapshot path.
    pub fn new(registry: Registry, config_path: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            config: ConfigFile::new(config_path),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the hot-add retry policy.
    #[must_use]
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Capture the tunables of every active device into the snapshot file.
    ///
    /// When there is nothing to capture the existing snapshot is left
    /// untouched, unless `force` asks for stale state to be removed.
    ///
    /// # Errors
    ///
    /// Returns an error when a device attribute cannot be read or the
    /// snapshot cannot be written.
    pub fn save(&self, force: bool) -> Result<SaveOutcome> {
        if !self.registry.control_present() {
            tracing::info!("zram-control not present, nothing to save");
            self.discard_stale(force)?;
            return Ok(SaveOutcome::ControlMissing);
        }

        let mut records = Vec::new();
        for device in self.registry.devices()? {
            if !self.registry.is_active(device)? {
                tracing::debug!(device, "inactive, not saved");
                continue;
            }
            tracing::info!(device, "saving configuration for /dev/zram{device}");
            records.push((format!("zram{device}"), self.capture(device)?));
        }

        if records.is_empty() {
            tracing::info!("no active devices, nothing to save");
            self.discard_stale(force)?;
            return Ok(SaveOutcome::NoActiveDevices);
        }

        self.config.write(&records)?;
        Ok(SaveOutcome::Saved(records.len()))
    }

    /// Re-create and configure devices from the snapshot file.
    ///
    /// Devices that are already active are never written to. Sections with
    /// malformed names are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error when the device family cannot be serviced at all:
    /// module load failure, missing control channel, a stalled hot-add, or
    /// an attribute write failure mid-apply.
    pub fn load(&self) -> Result<LoadOutcome> {
        let records = match self.config.read() {
            Ok(records) if records.is_empty() => return Ok(LoadOutcome::NoConfig),
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(error = %err, "could not read configuration file");
                return Ok(LoadOutcome::NoConfig);
            }
        };

        let hotadd = HotAdd::with_policy(&self.registry, self.retry);
        let mut configured = 0;
        let mut skipped = 0;

        for (section, record) in records {
            let Some(device) = parse_device_name(&section) else {
                tracing::warn!(section = %section, "invalid section name, skipping");
                skipped += 1;
                continue;
            };

            hotadd.ensure_exists(device)?;
            if !self.registry.device_present(device) {
                tracing::warn!(device, "/dev/zram{device} is not configured, skipping");
                skipped += 1;
                continue;
            }
            if self.registry.is_active(device)? {
                tracing::info!(device, "/dev/zram{device} already active, skipping");
                skipped += 1;
                continue;
            }

            tracing::info!(device, "loading configuration for /dev/zram{device}");
            for (attr, value) in record.attr_writes() {
                self.registry.write_attr(device, attr, &value)?;
            }
            configured += 1;
        }

        Ok(LoadOutcome::Applied {
            configured,
            skipped,
        })
    }

    /// Read one active device's tunables into a record.
    fn capture(&self, device: u32) -> Result<DeviceRecord> {
        let streams = self.registry.read_attr(device, "max_comp_streams")?;
        let algorithm = self.registry.read_attr(device, "comp_algorithm")?;
        let disksize = self.registry.read_attr(device, "disksize")?;

        // mem_limit itself is write-only; its value is observed through the
        // fourth mm_stat field when that attribute is present.
        let mem_limit = self
            .registry
            .read_mem_stat(device)
            .ok()
            .and_then(|fields| fields.get(3).and_then(|f| f.parse().ok()));

        Ok(DeviceRecord {
            max_comp_streams: Some(parse_u64(device, "max_comp_streams", &streams)?),
            comp_algorithm: active_algorithm(&algorithm).map(str::to_string),
            disksize: Some(parse_u64(device, "disksize", &disksize)?),
            mem_limit,
        })
    }

    fn discard_stale(&self, force: bool) -> Result<()> {
        if force {
            tracing::info!(
                path = %self.config.path().display(),
                "removing stale configuration file"
            );
            self.config.remove()?;
        }
        Ok(())
    }
}

fn parse_u64(device: u32, attr: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidValue(format!("{attr} of zram{device}: {raw:?}")))
}

/// Pick the bracket-marked token out of a raw `comp_algorithm` line.
///
/// The read side of the attribute lists every supported algorithm and wraps
/// the active one in `[...]`; only that token is of interest here.
#[must_use]
pub fn active_algorithm(raw: &str) -> Option<&str> {
    raw.split_whitespace()
        .find_map(|token| token.strip_prefix('[')?.strip_suffix(']'))
}
