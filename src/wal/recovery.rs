//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::Result;

use super::record::{self, Corruption, Decoded, Record, HEADER_SIZE};

/// Read buffer used by [`WalRecovery::verify`]
const DEFAULT_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Why a replay stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No further complete header in the file
    EndOfLog,

    /// The record starting at `offset` was rejected
    Corrupt { offset: u64, cause: Corruption },
}

/// Result of a recovery operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records handed to the apply callback
    pub records_applied: u64,

    /// How many of those were `SET`
    pub sets: u64,

    /// How many of those were `DEL`
    pub deletes: u64,

    /// Logical end of the log: offset just past the last valid record
    pub valid_len: u64,

    /// File size when the replay started
    pub file_len: u64,

    pub stop: StopReason,
}

impl RecoveryResult {
    fn empty(file_len: u64) -> Self {
        Self {
            records_applied: 0,
            sets: 0,
            deletes: 0,
            valid_len: 0,
            file_len,
            stop: StopReason::EndOfLog,
        }
    }

    /// Whether bytes exist past the logical end of the log
    pub fn has_torn_tail(&self) -> bool {
        self.valid_len < self.file_len
    }

    /// Number of bytes past the logical end of the log
    pub fn torn_bytes(&self) -> u64 {
        self.file_len.saturating_sub(self.valid_len)
    }
}

impl WalRecovery {
    /// Replay every valid record in the log at `path`, in order
    ///
    /// Opens its own read handle, so a writer on the same file keeps its
    /// append position. Stops at the end of the log or at the first invalid
    /// record; neither is an error. Only I/O failures are returned as `Err`.
    /// A missing file replays as an empty log.
    pub fn replay<F>(path: &Path, read_buffer_size: usize, mut apply: F) -> Result<RecoveryResult>
    where
        F: FnMut(Record),
    {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RecoveryResult::empty(0)),
            Err(e) => return Err(e.into()),
        };
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::with_capacity(read_buffer_size.max(HEADER_SIZE), file);
        let mut result = RecoveryResult::empty(file_len);

        debug!(path = %path.display(), file_len, "WAL replay started");

        loop {
            match record::decode(&mut reader)? {
                Decoded::Record(record) => {
                    result.valid_len += record.encoded_len() as u64;
                    result.records_applied += 1;
                    match record {
                        Record::Set { .. } => result.sets += 1,
                        Record::Del { .. } => result.deletes += 1,
                    }
                    apply(record);
                }
                Decoded::EndOfLog => {
                    result.stop = StopReason::EndOfLog;
                    break;
                }
                Decoded::Corrupt(cause) => {
                    result.stop = StopReason::Corrupt {
                        offset: result.valid_len,
                        cause,
                    };
                    break;
                }
            }
        }

        debug!(
            records = result.records_applied,
            valid_len = result.valid_len,
            stop = ?result.stop,
            "WAL replay finished"
        );

        Ok(result)
    }

    /// Scan a WAL file and report what a replay would recover
    ///
    /// Never modifies the file.
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::replay(path, DEFAULT_READ_BUFFER_SIZE, |_| {})
    }
}
