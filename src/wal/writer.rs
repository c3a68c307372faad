//! WAL Writer
//!
//! Handles appending records to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::BytesMut;
use tracing::{debug, error, trace, warn};

use crate::config::SyncPolicy;
use crate::error::{KvError, Result};

use super::record::{self, Op, MAX_KEY_SIZE, MAX_VALUE_SIZE};

/// File operations the writer needs beyond `Write`
///
/// Implemented for [`File`]; other implementations wrap a file to inject
/// failures.
pub trait LogFile: Write {
    /// Current length in bytes
    fn file_len(&self) -> io::Result<u64>;

    fn set_len(&mut self, len: u64) -> io::Result<()>;

    /// Persist file contents
    fn sync_data(&mut self) -> io::Result<()>;

    /// Persist file contents and metadata (including size)
    fn sync_all(&mut self) -> io::Result<()>;
}

impl LogFile for File {
    fn file_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync_data(&mut self) -> io::Result<()> {
        File::sync_data(self)
    }

    fn sync_all(&mut self) -> io::Result<()> {
        File::sync_all(self)
    }
}

/// Appends records to the WAL file
///
/// The writer takes `&mut self` for every mutation; callers that share it
/// across threads wrap it in a mutex, which makes encode, write, flush and
/// the optional sync one exclusive section.
pub struct WalWriter<F: LogFile = File> {
    /// Log file location (reported in logs)
    path: PathBuf,

    /// Append-mode handle, never used for reads
    file: F,

    /// Scratch buffer holding the record being appended
    buf: BytesMut,

    /// When appended records are forced to stable storage
    sync_policy: SyncPolicy,

    /// End offset of the last fully appended record
    committed_len: u64,

    /// Set when a failed append left bytes that could not be removed
    poisoned: bool,
}

impl WalWriter<File> {
    /// Open or create a WAL file in append mode
    pub fn open(path: &Path, sync_policy: SyncPolicy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Self::with_file(file, path, sync_policy)
    }
}

impl<F: LogFile> WalWriter<F> {
    /// Wrap an already opened append-mode handle for the log at `path`
    pub fn with_file(file: F, path: &Path, sync_policy: SyncPolicy) -> Result<Self> {
        let committed_len = file.file_len()?;

        debug!(path = %path.display(), committed_len, ?sync_policy, "WAL writer opened");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            buf: BytesMut::with_capacity(4096),
            sync_policy,
            committed_len,
            poisoned: false,
        })
    }

    /// Append a `SET` record
    pub fn append_set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.append(Op::Set, key, value)
    }

    /// Append a `DEL` record
    pub fn append_delete(&mut self, key: &[u8]) -> Result<()> {
        self.append(Op::Del, key, &[])
    }

    /// Append one record and apply the sync policy
    ///
    /// Either the whole record is committed or the log is rolled back to its
    /// previous length and the error returned.
    pub fn append(&mut self, op: Op, key: &[u8], value: &[u8]) -> Result<()> {
        if self.poisoned {
            return Err(KvError::WriterPoisoned);
        }
        validate(op, key, value)?;

        self.buf.clear();
        record::encode_into(&mut self.buf, op, key, value);

        if let Err(e) = self.write_record() {
            self.rollback();
            return Err(e);
        }

        self.committed_len += self.buf.len() as u64;
        trace!(
            ?op,
            key_len = key.len(),
            value_len = value.len(),
            offset = self.committed_len,
            "WAL append"
        );
        Ok(())
    }

    /// Force all appended records to stable storage
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        debug!(path = %self.path.display(), committed_len = self.committed_len, "WAL synced");
        Ok(())
    }

    /// Cut the log to `len` bytes, discarding everything after it
    pub fn truncate_to(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        self.file.sync_all()?;
        self.committed_len = len;
        Ok(())
    }

    /// Flush and sync, then release the file handle
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// End offset of the last committed record
    pub fn committed_len(&self) -> u64 {
        self.committed_len
    }

    pub fn sync_policy(&self) -> SyncPolicy {
        self.sync_policy
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Single write for the whole frame, then flush (and sync per policy)
    fn write_record(&mut self) -> Result<()> {
        self.file.write_all(&self.buf)?;
        self.file.flush()?;
        if self.sync_policy == SyncPolicy::EveryWrite {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Drop any bytes of a failed append so later records stay reachable
    fn rollback(&mut self) {
        match self.file.set_len(self.committed_len) {
            Ok(()) => {
                warn!(
                    path = %self.path.display(),
                    committed_len = self.committed_len,
                    "WAL append failed, rolled back"
                );
            }
            Err(e) => {
                error!(
                    path = %self.path.display(),
                    error = %e,
                    "WAL rollback failed, writer poisoned"
                );
                self.poisoned = true;
            }
        }
    }
}

/// Check bounds the replayer enforces, so nothing unreadable is ever logged
fn validate(op: Op, key: &[u8], value: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(KvError::InvalidRecord("key must not be empty".to_string()));
    }
    if key.len() > MAX_KEY_SIZE {
        return Err(KvError::InvalidRecord(format!(
            "key is {} bytes, limit is {}",
            key.len(),
            MAX_KEY_SIZE
        )));
    }
    if value.len() > MAX_VALUE_SIZE {
        return Err(KvError::InvalidRecord(format!(
            "value is {} bytes, limit is {}",
            value.len(),
            MAX_VALUE_SIZE
        )));
    }
    if op == Op::Del && !value.is_empty() {
        return Err(KvError::InvalidRecord("delete carries no value".to_string()));
    }
    Ok(())
}
