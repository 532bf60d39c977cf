//! Process-wide dedup store
//!
//! Guarantees that at most one caller gets past [`DedupStore::check_and_mark`]
//! for a given address. Eviction is coarse: once the store grows past its
//! ceiling, every entry is dropped at once. An address seen before a mass
//! eviction is therefore treated as new afterwards. A bounded LRU would keep
//! recent entries, but would change which repeats get suppressed.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// Bounded set of already-dispatched token addresses
pub struct DedupStore {
    seen: Mutex<HashSet<String>>,
    max_entries: usize,
    evictions: AtomicU64,
}

impl DedupStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
            max_entries,
            evictions: AtomicU64::new(0),
        }
    }

    // A panic while holding the lock cannot leave the set half-updated
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether the address has not been marked yet
    pub fn is_new(&self, address: &str) -> bool {
        !self.lock().contains(address)
    }

    /// Mark an address as seen
    pub fn mark_seen(&self, address: &str) {
        let mut seen = self.lock();
        seen.insert(address.to_string());
        self.evict_locked(&mut seen);
    }

    /// Atomic check-and-set: returns true for exactly one caller per
    /// address between evictions
    pub fn check_and_mark(&self, address: &str) -> bool {
        let mut seen = self.lock();
        if !seen.insert(address.to_string()) {
            return false;
        }
        self.evict_locked(&mut seen);
        true
    }

    /// Clear the store if it is over its ceiling; returns entries dropped
    pub fn evict_if_full(&self) -> usize {
        let mut seen = self.lock();
        self.evict_locked(&mut seen)
    }

    fn evict_locked(&self, seen: &mut HashSet<String>) -> usize {
        if seen.len() <= self.max_entries {
            return 0;
        }
        let dropped = seen.len();
        seen.clear();
        self.evictions.fetch_add(1, Ordering::Relaxed);
        info!(dropped, ceiling = self.max_entries, "Dedup store cleared");
        dropped
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of mass evictions so far
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}
