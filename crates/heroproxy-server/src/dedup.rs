//! Per-key request deduplication.
//!
//! Concurrent identical searches collapse onto one winner: the first caller
//! for a key does the upstream work while co-waiters block on the key's
//! lock, then find the result already cached.
//!
//! Entries are reference-counted. The waiter count is mutated only under
//! the map's shard lock (the entry API on acquire, `remove_if` on release),
//! so "last waiter removes the entry" cannot race a new caller inserting
//! one: either the newcomer sees the live entry and keeps it alive, or it
//! finds the key vacant and creates a fresh entry.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

struct DedupEntry {
    lock: Arc<Mutex<()>>,
    waiters: AtomicUsize,
}

/// Lock table collapsing concurrent identical requests.
pub struct RequestDeduper {
    locks: Arc<DashMap<String, Arc<DedupEntry>>>,
}

impl RequestDeduper {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Acquire the lock for `key`, waiting behind any in-flight twin
    /// request. The returned guard releases the lock on drop and removes
    /// the table entry when it was the last interested caller.
    pub async fn acquire(&self, key: &str) -> DedupGuard {
        let entry = {
            let entry_ref = self
                .locks
                .entry(key.to_string())
                .and_modify(|e| {
                    e.waiters.fetch_add(1, Ordering::SeqCst);
                })
                .or_insert_with(|| {
                    Arc::new(DedupEntry {
                        lock: Arc::new(Mutex::new(())),
                        waiters: AtomicUsize::new(1),
                    })
                });
            Arc::clone(entry_ref.value())
            // entry_ref (and the shard lock) drops here, before the await
        };

        let permit = entry.lock.clone().lock_owned().await;
        DedupGuard {
            locks: Arc::clone(&self.locks),
            key: key.to_string(),
            entry,
            _permit: permit,
        }
    }

    /// Number of live lock entries. Zero whenever no request is in flight.
    pub fn entry_count(&self) -> usize {
        self.locks.len()
    }
}

impl Default for RequestDeduper {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestDeduper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDeduper")
            .field("entries", &self.locks.len())
            .finish()
    }
}

/// RAII guard for one acquired dedup lock.
pub struct DedupGuard {
    locks: Arc<DashMap<String, Arc<DedupEntry>>>,
    key: String,
    entry: Arc<DedupEntry>,
    _permit: OwnedMutexGuard<()>,
}

impl Drop for DedupGuard {
    fn drop(&mut self) {
        if self.entry.waiters.fetch_sub(1, Ordering::SeqCst) == 1 {
            // remove_if runs under the shard lock, serialized against the
            // entry API in acquire(); a newcomer that bumped the count in
            // the meantime keeps the entry alive.
            self.locks
                .remove_if(&self.key, |_, e| e.waiters.load(Ordering::SeqCst) == 0);
        }
    }
}
