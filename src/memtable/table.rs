//! MemTable implementation
//!
//! HashMap-based table with RwLock for concurrency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::wal::Record;

/// In-memory key-value table
pub struct MemTable {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,

    /// Sum of key and value lengths; only changed under the write lock
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Get a copy of the value for `key` (read lock)
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.data.read().contains_key(key)
    }

    /// Insert or overwrite a key (write lock)
    pub fn insert(&self, key: Vec<u8>, value: Vec<u8>) {
        let mut data = self.data.write();
        let key_len = key.len();
        let value_len = value.len();
        match data.insert(key, value) {
            Some(old) => {
                // Same key, only the value length changes
                self.size.fetch_add(value_len, Ordering::Relaxed);
                self.size.fetch_sub(old.len(), Ordering::Relaxed);
            }
            None => {
                self.size.fetch_add(key_len + value_len, Ordering::Relaxed);
            }
        }
    }

    /// Remove a key, returning whether it was present (write lock)
    pub fn remove(&self, key: &[u8]) -> bool {
        let mut data = self.data.write();
        match data.remove_entry(key) {
            Some((k, v)) => {
                self.size.fetch_sub(k.len() + v.len(), Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Apply a logged mutation: `Set` overwrites, `Del` removes
    pub fn apply(&self, record: Record) {
        match record {
            Record::Set { key, value } => self.insert(key, value),
            Record::Del { key } => {
                self.remove(&key);
            }
        }
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Approximate size in bytes (keys + values)
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Copy of every pair, sorted by key
    pub fn snapshot(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut pairs: Vec<_> = self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        pairs
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}
