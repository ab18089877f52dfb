//! Hot-add control channel driver.
//!
//! zram devices beyond those created at module load time are requested
//! through `/sys/class/zram-control/hot_add`: reading the file asks the
//! kernel for another device and returns the highest index now available.

use crate::registry::Registry;
use crate::{Error, Result};
use std::process::Command;
use std::thread;
use std::time::Duration;

/// Retry behavior for the hot-add probe loop.
///
/// The default reproduces the historical behavior: probe again immediately,
/// with no attempt cap.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
    /// Maximum probe cycles per device before giving up. `None` keeps
    /// probing until the control channel satisfies the request.
    pub max_attempts: Option<u32>,
    /// Pause between probe cycles.
    pub delay: Duration,
}

/// Creates devices on demand through the hot-add control channel.
#[derive(Debug)]
pub struct HotAdd<'a> {
    registry: &'a Registry,
    policy: RetryPolicy,
}

impl<'a> HotAdd<'a> {
    /// Controller with the default retry policy.
    #[must_use]
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            policy: RetryPolicy::default(),
        }
    }

    /// Controller with an explicit retry policy.
    #[must_use]
    pub fn with_policy(registry: &'a Registry, policy: RetryPolicy) -> Self {
        Self { registry, policy }
    }

    /// Make sure `zram<device>` exists, hot-adding devices until the control
    /// channel reports an index at or beyond it.
    ///
    /// Returns immediately when the device is already present. The probe
    /// loop ends once the reported index reaches the target; the caller is
    /// responsible for re-checking presence afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModuleLoad`] if the zram module is absent and
    /// modprobe fails, [`Error::ControlChannelMissing`] if the control
    /// channel does not exist, and [`Error::HotAddStalled`] when a bounded
    /// policy runs out of attempts.
    pub fn ensure_exists(&self, device: u32) -> Result<()> {
        let mut attempts: u32 = 0;
        while !self.registry.device_present(device) {
            if !self.registry.module_present() {
                load_module()?;
            }
            if !self.registry.control_present() {
                return Err(Error::ControlChannelMissing);
            }

            let highest = self.registry.hot_add()?;
            tracing::debug!(device, highest, "hot-add probe");
            if highest >= device {
                break;
            }

            attempts += 1;
            if let Some(max) = self.policy.max_attempts {
                if attempts >= max {
                    return Err(Error::HotAddStalled(device));
                }
            }
            if !self.policy.delay.is_zero() {
                thread::sleep(self.policy.delay);
            }
        }
        Ok(())
    }
}

/// Load the zram kernel module.
fn load_module() -> Result<()> {
    tracing::info!("loading zram module");
    let status = Command::new("/sbin/modprobe")
        .arg("zram")
        .status()
        .map_err(|e| Error::Io(format!("failed to run modprobe: {e}")))?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::ModuleLoad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn synthetic_root() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("block")).unwrap();
        fs::create_dir_all(root.path().join("class/zram-control")).unwrap();
        fs::create_dir_all(root.path().join("module/zram")).unwrap();
        root
    }

    fn set_hot_add(root: &Path, reported: u32) {
        fs::write(
            root.join("class/zram-control/hot_add"),
            format!("{reported}\n"),
        )
        .unwrap();
    }

    #[test]
    fn test_present_device_short_circuits() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("block/zram0")).unwrap();

        // No module dir, no control channel: must not matter.
        let registry = Registry::with_root(root.path());
        HotAdd::new(&registry).ensure_exists(0).unwrap();
    }

    #[test]
    fn test_missing_control_channel_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("block")).unwrap();
        fs::create_dir_all(root.path().join("module/zram")).unwrap();

        let registry = Registry::with_root(root.path());
        let err = HotAdd::new(&registry).ensure_exists(1).unwrap_err();
        assert!(matches!(err, Error::ControlChannelMissing));
    }

    #[test]
    fn test_probe_ends_when_reported_index_reaches_target() {
        let root = synthetic_root();
        set_hot_add(root.path(), 5);

        // The synthetic channel cannot create directories, so a successful
        // return with the device still absent is the expected shape here.
        let registry = Registry::with_root(root.path());
        HotAdd::new(&registry).ensure_exists(3).unwrap();
        assert!(!registry.device_present(3));
    }

    #[test]
    fn test_bounded_policy_stalls_out() {
        let root = synthetic_root();
        set_hot_add(root.path(), 0);

        let registry = Registry::with_root(root.path());
        let policy = RetryPolicy {
            max_attempts: Some(3),
            delay: Duration::ZERO,
        };
        let err = HotAdd::with_policy(&registry, policy)
            .ensure_exists(4)
            .unwrap_err();
        assert!(matches!(err, Error::HotAddStalled(4)));
    }

    #[test]
    fn test_default_policy_is_tight_poll() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.delay, Duration::ZERO);
    }
}
