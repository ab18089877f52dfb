//! Sysfs access to zram block devices.
//!
//! The registry wraps the three sysfs roots the tool touches: the per-device
//! attribute directories under `/sys/block`, the hot-add control channel
//! under `/sys/class/zram-control`, and the module presence indicator under
//! `/sys/module/zram`. All three can be relocated under a single root so the
//! reconciliation logic runs against a synthetic tree in tests.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Handle to the live set of zram devices and their sysfs attributes.
#[derive(Debug, Clone)]
pub struct Registry {
    block_dir: PathBuf,
    control_dir: PathBuf,
    module_dir: PathBuf,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Registry over the system sysfs mount.
    #[must_use]
    pub fn new() -> Self {
        Self {
            block_dir: PathBuf::from("/sys/block"),
            control_dir: PathBuf::from("/sys/class/zram-control"),
            module_dir: PathBuf::from("/sys/module/zram"),
        }
    }

    /// Registry with all sysfs paths relocated under `root`.
    ///
    /// Expects `block`, `class/zram-control`, and `module/zram` under the
    /// given directory, mirroring the system layout.
    #[must_use]
    pub fn with_root(root: &Path) -> Self {
        Self {
            block_dir: root.join("block"),
            control_dir: root.join("class/zram-control"),
            module_dir: root.join("module/zram"),
        }
    }

    fn device_dir(&self, device: u32) -> PathBuf {
        self.block_dir.join(format!("zram{device}"))
    }

    fn attr_path(&self, device: u32, attr: &str) -> PathBuf {
        self.device_dir(device).join(attr)
    }

    /// Indices of the zram devices currently present, sorted ascending.
    ///
    /// The block directory is re-read on every call; nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the block directory cannot be read.
    pub fn devices(&self) -> Result<Vec<u32>> {
        let entries = std::fs::read_dir(&self.block_dir)
            .map_err(|e| Error::Io(format!("failed to read {}: {e}", self.block_dir.display())))?;

        let mut devices = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::Io(format!("failed to read {}: {e}", self.block_dir.display()))
            })?;
            if let Some(index) = parse_device_name(&entry.file_name().to_string_lossy()) {
                devices.push(index);
            }
        }
        devices.sort_unstable();
        Ok(devices)
    }

    /// Check whether the device's sysfs directory exists.
    #[must_use]
    pub fn device_present(&self, device: u32) -> bool {
        self.device_dir(device).exists()
    }

    /// A device with a non-zero disksize is active.
    ///
    /// # Errors
    ///
    /// Returns an error if the disksize attribute cannot be read or parsed;
    /// read failures are propagated, not treated as "inactive".
    pub fn is_active(&self, device: u32) -> Result<bool> {
        let raw = self.read_attr(device, "disksize")?;
        let size: u64 = raw
            .trim()
            .parse()
            .map_err(|_| Error::InvalidValue(format!("disksize of zram{device}: {raw:?}")))?;
        Ok(size != 0)
    }

    /// Read the first line of a device attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute file cannot be read.
    pub fn read_attr(&self, device: u32, attr: &str) -> Result<String> {
        let path = self.attr_path(device, attr);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Io(format!("failed to read {}: {e}", path.display())))?;
        Ok(content.lines().next().unwrap_or("").to_string())
    }

    /// Whitespace-split fields of the device's mm_stat attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute file cannot be read.
    pub fn read_mem_stat(&self, device: u32) -> Result<Vec<String>> {
        let raw = self.read_attr(device, "mm_stat")?;
        Ok(raw.split_whitespace().map(str::to_string).collect())
    }

    /// Write a device attribute as its full content.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute file cannot be written.
    pub fn write_attr(&self, device: u32, attr: &str, value: &str) -> Result<()> {
        let path = self.attr_path(device, attr);
        tracing::debug!(device, attr, value, "writing attribute");
        std::fs::write(&path, value)
            .map_err(|e| Error::Io(format!("failed to write {}: {e}", path.display())))
    }

    /// Check whether the zram kernel module is loaded.
    #[must_use]
    pub fn module_present(&self) -> bool {
        self.module_dir.exists()
    }

    /// Check whether the hot-add control channel exists.
    #[must_use]
    pub fn control_present(&self) -> bool {
        self.control_dir.exists()
    }

    /// Request another device via the control channel.
    ///
    /// Reading `hot_add` asks the kernel for a new device and returns the
    /// highest index now available.
    ///
    /// # Errors
    ///
    /// Returns an error if the control file cannot be read or the reported
    /// index does not parse.
    pub fn hot_add(&self) -> Result<u32> {
        let path = self.control_dir.join("hot_add");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Io(format!("failed to read {}: {e}", path.display())))?;
        content
            .trim()
            .parse()
            .map_err(|_| Error::InvalidValue(format!("device number from hot_add: {content:?}")))
    }
}

/// Parse a `zram<N>` device name into its index.
///
/// Returns `None` when the prefix is wrong or the numeric suffix is empty
/// or non-numeric.
#[must_use]
pub fn parse_device_name(name: &str) -> Option<u32> {
    let suffix = name.strip_prefix("zram")?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn synthetic_root() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("block")).unwrap();
        fs::create_dir_all(root.path().join("class/zram-control")).unwrap();
        fs::create_dir_all(root.path().join("module/zram")).unwrap();
        root
    }

    fn add_device(root: &Path, device: u32, disksize: &str) {
        let dir = root.join(format!("block/zram{device}"));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("disksize"), disksize).unwrap();
    }

    #[test]
    fn test_parse_device_name() {
        assert_eq!(parse_device_name("zram0"), Some(0));
        assert_eq!(parse_device_name("zram12"), Some(12));
        assert_eq!(parse_device_name("zram"), None);
        assert_eq!(parse_device_name("zramfoo"), None);
        assert_eq!(parse_device_name("zram1a"), None);
        assert_eq!(parse_device_name("loop0"), None);
    }

    #[test]
    fn test_devices_sorted_and_filtered() {
        let root = synthetic_root();
        add_device(root.path(), 2, "0");
        add_device(root.path(), 0, "0");
        fs::create_dir_all(root.path().join("block/loop0")).unwrap();
        fs::create_dir_all(root.path().join("block/zramx")).unwrap();

        let registry = Registry::with_root(root.path());
        assert_eq!(registry.devices().unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_devices_reenumerated_each_call() {
        let root = synthetic_root();
        let registry = Registry::with_root(root.path());
        assert_eq!(registry.devices().unwrap(), Vec::<u32>::new());

        add_device(root.path(), 1, "0");
        assert_eq!(registry.devices().unwrap(), vec![1]);
    }

    #[test]
    fn test_is_active() {
        let root = synthetic_root();
        add_device(root.path(), 0, "1048576\n");
        add_device(root.path(), 1, "0\n");

        let registry = Registry::with_root(root.path());
        assert!(registry.is_active(0).unwrap());
        assert!(!registry.is_active(1).unwrap());
    }

    #[test]
    fn test_is_active_propagates_read_failure() {
        let root = synthetic_root();
        let registry = Registry::with_root(root.path());
        let err = registry.is_active(9).unwrap_err();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_read_attr_first_line_only() {
        let root = synthetic_root();
        add_device(root.path(), 0, "0");
        let dir = root.path().join("block/zram0");
        fs::write(dir.join("comp_algorithm"), "lzo [lz4] zstd\nsecond line\n").unwrap();

        let registry = Registry::with_root(root.path());
        assert_eq!(
            registry.read_attr(0, "comp_algorithm").unwrap(),
            "lzo [lz4] zstd"
        );
    }

    #[test]
    fn test_read_mem_stat_fields() {
        let root = synthetic_root();
        add_device(root.path(), 0, "0");
        let dir = root.path().join("block/zram0");
        fs::write(dir.join("mm_stat"), "  0   0 0    2048 9 9 9\n").unwrap();

        let registry = Registry::with_root(root.path());
        let fields = registry.read_mem_stat(0).unwrap();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[3], "2048");
    }

    #[test]
    fn test_write_attr_round_trip() {
        let root = synthetic_root();
        add_device(root.path(), 0, "0");

        let registry = Registry::with_root(root.path());
        registry.write_attr(0, "max_comp_streams", "4").unwrap();
        assert_eq!(registry.read_attr(0, "max_comp_streams").unwrap(), "4");
    }

    #[test]
    fn test_presence_probes() {
        let root = synthetic_root();
        add_device(root.path(), 0, "0");

        let registry = Registry::with_root(root.path());
        assert!(registry.device_present(0));
        assert!(!registry.device_present(1));
        assert!(registry.module_present());
        assert!(registry.control_present());
    }

    #[test]
    fn test_hot_add_reports_highest_index() {
        let root = synthetic_root();
        fs::write(root.path().join("class/zram-control/hot_add"), "5\n").unwrap();

        let registry = Registry::with_root(root.path());
        assert_eq!(registry.hot_add().unwrap(), 5);
    }

    #[test]
    fn test_hot_add_missing_channel() {
        let root = tempfile::tempdir().unwrap();
        let registry = Registry::with_root(root.path());
        assert!(registry.hot_add().is_err());
    }
}
