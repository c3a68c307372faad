//! MemTable Module
//!
//! In-memory key-value table rebuilt from the WAL.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Many concurrent readers, one writer at a time
//! - Hand out copies so callers never alias internal buffers
//!
//! ## Data Structure Choice
//! A `HashMap` behind a `parking_lot::RwLock`. Keys have no ordering
//! semantics; `snapshot()` sorts on demand.

mod table;

pub use table::MemTable;
