//! Error types for zramcfg-core.

use thiserror::Error;

/// Errors that can occur while reconciling device state.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (sysfs or snapshot file access).
    #[error("I/O error: {0}")]
    Io(String),

    /// An attribute or control-channel value did not parse.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The zram kernel module could not be loaded.
    #[error("cannot load zram module")]
    ModuleLoad,

    /// The hot-add control channel is absent.
    #[error("zram-control not present")]
    ControlChannelMissing,

    /// The control channel never reported the requested device index.
    #[error("hot-add stalled before reaching zram{0}")]
    HotAddStalled(u32),

    /// The snapshot file is unreadable or malformed.
    #[error("configuration file error: {0}")]
    Config(String),
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
