//! Store Module
//!
//! The storage facade that coordinates the WAL and the MemTable.
//!
//! ## Responsibilities
//! - Rebuild the MemTable from the WAL on open
//! - Serve reads from memory only
//! - Log every mutation before it becomes visible

use std::fs;
use std::path::Path;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::{Config, SyncPolicy};
use crate::error::Result;
use crate::memtable::MemTable;
use crate::wal::{Op, Record, RecoveryResult, StopReason, WalRecovery, WalWriter};

/// A durable key-value store backed by a single WAL file
///
/// ## Concurrency Model
///
/// - **Writes** (set/del): serialized by the `wal` mutex, which stays held
///   until the MemTable has been updated. Log order and table order
///   therefore agree for every key.
/// - **Reads** (get): only take the MemTable read lock. The table write lock
///   is taken after the append finishes, so readers never wait on disk I/O.
///
/// A `Store` only exists once recovery has finished; `close` consumes it.
pub struct Store {
    /// Store configuration
    config: Config,

    /// Append handle to the log (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// Materialized state of the log (internal RwLock)
    memtable: MemTable,

    /// What the startup replay found
    recovery: RecoveryResult,
}

impl Store {
    /// Open or create a store at `path` with the given durability policy
    pub fn open(path: impl AsRef<Path>, sync_policy: SyncPolicy) -> Result<Self> {
        let config = Config::builder()
            .wal_path(path.as_ref())
            .sync_policy(sync_policy)
            .build();
        Self::open_with_config(config)
    }

    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Create the parent directory if missing
    /// 2. Open the append handle (creates the log)
    /// 3. Replay the log into a fresh MemTable
    /// 4. Cut any torn tail so new records follow the last valid one
    pub fn open_with_config(config: Config) -> Result<Self> {
        if let Some(parent) = config.wal_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut wal = WalWriter::open(&config.wal_path, config.sync_policy)?;

        let memtable = MemTable::new();
        let recovery = WalRecovery::replay(&config.wal_path, config.read_buffer_size, |record| {
            memtable.apply(record)
        })?;

        if let StopReason::Corrupt { offset, cause } = recovery.stop {
            warn!(offset, %cause, "WAL replay stopped at invalid record");
        }

        if recovery.has_torn_tail() {
            if config.truncate_torn_tail {
                warn!(
                    valid_len = recovery.valid_len,
                    torn_bytes = recovery.torn_bytes(),
                    "Truncating torn WAL tail"
                );
                wal.truncate_to(recovery.valid_len)?;
            } else {
                warn!(
                    valid_len = recovery.valid_len,
                    torn_bytes = recovery.torn_bytes(),
                    "WAL has a torn tail; records appended after it will not be replayed"
                );
            }
        }

        info!(
            path = %config.wal_path.display(),
            records = recovery.records_applied,
            keys = memtable.len(),
            "WAL recovery complete"
        );

        Ok(Self {
            config,
            wal: Mutex::new(wal),
            memtable,
            recovery,
        })
    }

    /// Get a copy of the value stored under `key`
    ///
    /// Never touches the log.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.memtable.get(key.as_bytes())
    }

    /// Store `value` under `key`
    ///
    /// The record is appended (and synced, per policy) before the value
    /// becomes visible. On error the table is unchanged.
    pub fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.append_then_apply(Op::Set, key, value)
    }

    /// Remove `key`; removing an absent key still logs and succeeds
    pub fn del(&self, key: &str) -> Result<()> {
        self.append_then_apply(Op::Del, key, &[])
    }

    /// Force every appended record to stable storage
    pub fn sync(&self) -> Result<()> {
        self.wal.lock().sync()
    }

    /// Close the store gracefully
    ///
    /// Flushes and syncs the log, then releases the handle.
    pub fn close(self) -> Result<()> {
        self.wal.into_inner().close()
    }

    /// The single write path: log first, then mutate the table
    fn append_then_apply(&self, op: Op, key: &str, value: &[u8]) -> Result<()> {
        let mut wal = self.wal.lock();
        wal.append(op, key.as_bytes(), value)?;
        self.memtable.apply(Record::new(op, key.as_bytes().to_vec(), value.to_vec()));
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn contains_key(&self, key: &str) -> bool {
        self.memtable.contains_key(key.as_bytes())
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.memtable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memtable.is_empty()
    }

    /// Copy of every pair, sorted by key
    pub fn snapshot(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.memtable.snapshot()
    }

    /// Statistics from the replay that ran during open
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.config.wal_path
    }

    pub fn sync_policy(&self) -> SyncPolicy {
        self.config.sync_policy
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
