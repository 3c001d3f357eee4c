//! Per-key lock table.
//!
//! Redemption, settlement, and expiry extension must each be a single
//! atomic read-modify-write per key. The table hands out one mutex per
//! storage key on demand; unrelated keys never contend, so a settlement
//! on one account never blocks work on another. Dropping the last handle
//! for a key removes its entry, so the table only holds keys with an
//! operation in flight.
//!
//! When an operation touches several accounts (settlement extends the
//! buyer and possibly the referrer), callers must acquire the account
//! locks in ascending key order to stay deadlock-free.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A table of per-key mutexes.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<Vec<u8>, Arc<Mutex<()>>>>,
}

/// The lock for one key. Call [`KeyLock::guard`] to hold it. Dropping
/// the last handle for a key releases its table entry.
pub struct KeyLock<'a> {
    table: &'a KeyLocks,
    key: Vec<u8>,
    lock: Arc<Mutex<()>>,
}

impl KeyLock<'_> {
    /// Block until the key is exclusively held.
    #[must_use]
    pub fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for KeyLock<'_> {
    fn drop(&mut self) {
        let mut locks = self
            .table
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = locks.get(&self.key) {
            // Two strong refs left means the table entry and this handle:
            // nobody else can be waiting on the key.
            if Arc::strong_count(entry) <= 2 {
                locks.remove(&self.key);
            }
        }
    }
}

impl KeyLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock for a key.
    #[must_use]
    pub fn lock_for(&self, key: &[u8]) -> KeyLock<'_> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = locks
            .entry(key.to_vec())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyLock {
            table: self,
            key: key.to_vec(),
            lock,
        }
    }

    /// Number of keys with an operation in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no key is currently held or pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
