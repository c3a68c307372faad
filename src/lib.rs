//! # walkv
//!
//! A durable single-node key-value store with:
//! - Write-Ahead Logging (WAL) with CRC32-checked binary records
//! - Crash recovery that tolerates torn and corrupt tails
//! - Configurable durability (no fsync, or fsync on every write)
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Store                                 │
//! │              get / set / del / sync / close                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │ set/del: log first      │ get: memory only
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  WalWriter  │          │  MemTable   │
//!   │  (Mutex)    │          │  (RwLock)   │
//!   └──────┬──────┘          └──────▲──────┘
//!          │                        │
//!          ▼                        │ on open
//!   ┌─────────────┐          ┌──────┴──────┐
//!   │  wal file   │─────────▶│ WalRecovery │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use walkv::{Store, SyncPolicy};
//!
//! let store = Store::open("data/walkv.log", SyncPolicy::EveryWrite).unwrap();
//! store.set("name", b"durable").unwrap();
//! assert_eq!(store.get("name"), Some(b"durable".to_vec()));
//! store.close().unwrap();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod memtable;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::{Config, SyncPolicy};
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of walkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
