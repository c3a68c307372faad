//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append a record before any mutation becomes visible
//! - CRC32 checksums for corruption detection
//! - Crash recovery and replay, tolerating a torn tail
//!
//! ## File Format
//! All integers are little-endian. The checksum covers every byte before it.
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Record 1                                                 │
//! │ ┌────────┬───────────┬───────────┬─────┬───────┬───────┐ │
//! │ │ Op (1) │KeyLen (4) │ValLen (4) │ Key │ Value │CRC (4)│ │
//! │ └────────┴───────────┴───────────┴─────┴───────┴───────┘ │
//! ├──────────────────────────────────────────────────────────┤
//! │ Record 2                                                 │
//! │ ...                                                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//! Op is `1` for SET and `2` for DEL. A DEL record has `ValLen = 0`.

mod record;
mod writer;
mod recovery;

pub use record::{
    decode, encode, encode_into, encoded_len, Corruption, Decoded, Op, Record, CHECKSUM_SIZE,
    HEADER_SIZE, MAX_KEY_SIZE, MAX_VALUE_SIZE,
};
pub use writer::{LogFile, WalWriter};
pub use recovery::{RecoveryResult, StopReason, WalRecovery};
