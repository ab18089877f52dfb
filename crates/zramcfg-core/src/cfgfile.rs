//! The on-disk snapshot format.
//!
//! One INI section per device, named `zram<N>`, holding the tunables needed
//! to re-create it. Section order is preserved on both read and write.

use crate::{Error, Result};
use ini::{Ini, Properties};
use std::path::{Path, PathBuf};

/// Per-device tunables in the order they must be written back.
///
/// `disksize` activates the device, so algorithm and stream count come
/// before it and `mem_limit` after.
pub const CFG_ATTRS: [&str; 4] = ["max_comp_streams", "comp_algorithm", "disksize", "mem_limit"];

/// Snapshot of one device's tunables.
///
/// Fields are optional: a device whose algorithm line carries no bracketed
/// token has no algorithm to record, and `mem_limit` is only captured when
/// the mm_stat proxy is available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Compression stream count.
    pub max_comp_streams: Option<u64>,
    /// Active compression algorithm.
    pub comp_algorithm: Option<String>,
    /// Device size in bytes; writing it activates the device.
    pub disksize: Option<u64>,
    /// Memory limit in bytes.
    pub mem_limit: Option<u64>,
}

impl DeviceRecord {
    /// The attribute writes needed to apply this record, in canonical
    /// [`CFG_ATTRS`] order. Absent fields produce no write.
    #[must_use]
    pub fn attr_writes(&self) -> Vec<(&'static str, String)> {
        let mut writes = Vec::new();
        if let Some(streams) = self.max_comp_streams {
            writes.push(("max_comp_streams", streams.to_string()));
        }
        if let Some(ref algorithm) = self.comp_algorithm {
            writes.push(("comp_algorithm", algorithm.clone()));
        }
        if let Some(size) = self.disksize {
            writes.push(("disksize", size.to_string()));
        }
        if let Some(limit) = self.mem_limit {
            writes.push(("mem_limit", limit.to_string()));
        }
        writes
    }

    fn from_props(props: &Properties) -> Result<Self> {
        Ok(Self {
            max_comp_streams: parse_opt_u64(props, "max_comp_streams")?,
            comp_algorithm: props.get("comp_algorithm").map(str::to_string),
            disksize: parse_opt_u64(props, "disksize")?,
            mem_limit: parse_opt_u64(props, "mem_limit")?,
        })
    }
}

fn parse_opt_u64(props: &Properties, key: &str) -> Result<Option<u64>> {
    match props.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("invalid {key} value {raw:?}"))),
    }
}

/// Reader and writer for the snapshot file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    /// Snapshot file at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sections in file order with their parsed records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the file cannot be read or parsed,
    /// including non-numeric values in numeric keys.
    pub fn read(&self) -> Result<Vec<(String, DeviceRecord)>> {
        let ini = Ini::load_from_file(&self.path)
            .map_err(|e| Error::Config(format!("{}: {e}", self.path.display())))?;

        let mut records = Vec::new();
        for (section, props) in ini.iter() {
            if let Some(name) = section {
                records.push((name.to_string(), DeviceRecord::from_props(props)?));
            }
        }
        Ok(records)
    }

    /// Overwrite the snapshot with the given sections, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, records: &[(String, DeviceRecord)]) -> Result<()> {
        let mut ini = Ini::new();
        for (section, record) in records {
            for (key, value) in record.attr_writes() {
                ini.with_section(Some(section.as_str())).set(key, value);
            }
        }
        ini.write_to_file(&self.path)
            .map_err(|e| Error::Io(format!("failed to write {}: {e}", self.path.display())))
    }

    /// Delete the snapshot file. Missing files are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be removed.
    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(format!(
                "failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}
