//! Configuration for walkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{KvError, Result};

/// Main configuration for a walkv store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path of the append-only log file (created if absent)
    pub wal_path: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync policy: when appended records are forced to stable storage
    pub sync_policy: SyncPolicy,

    /// Buffer size used by the replayer's read handle (bytes)
    pub read_buffer_size: usize,

    /// Cut bytes past the last valid record before accepting writes
    pub truncate_torn_tail: bool,
}

/// WAL durability policy
///
/// Numeric levels `0` and `1` map to [`SyncPolicy::Never`] and
/// [`SyncPolicy::EveryWrite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// Never fsync automatically. Records reach OS buffers on every append
    /// but may be lost on power failure until [`crate::Store::sync`] runs.
    #[default]
    Never,

    /// fsync after every append (safest, slowest)
    EveryWrite,
}

impl SyncPolicy {
    /// Numeric durability level (0 or 1)
    pub fn level(self) -> u8 {
        match self {
            SyncPolicy::Never => 0,
            SyncPolicy::EveryWrite => 1,
        }
    }
}

impl TryFrom<u8> for SyncPolicy {
    type Error = KvError;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            0 => Ok(SyncPolicy::Never),
            1 => Ok(SyncPolicy::EveryWrite),
            other => Err(KvError::Config(format!(
                "unknown durability level {} (expected 0 or 1)",
                other
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wal_path: PathBuf::from("./walkv.log"),
            sync_policy: SyncPolicy::Never,
            read_buffer_size: 1024 * 1024, // 1 MB
            truncate_torn_tail: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the log file path
    pub fn wal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.wal_path = path.into();
        self
    }

    /// Set the durability policy
    pub fn sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.config.sync_policy = policy;
        self
    }

    /// Set the replay read buffer size (in bytes)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Enable or disable torn-tail truncation on open
    pub fn truncate_torn_tail(mut self, enabled: bool) -> Self {
        self.config.truncate_torn_tail = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
