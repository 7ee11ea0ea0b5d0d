//! Caches backing the engine.
//!
//! Three caches with separate jobs:
//! - [`HeroStore`] - heroes by ID, TTL plus capacity bound
//! - [`SearchCache`] - normalized search key to resolved IDs, so concurrent
//!   and repeated identical searches stop at one upstream call
//! - [`NegativeCache`] - confirmed-empty search keys on a short independent
//!   TTL, stopping cache-penetration storms
//!
//! Expiry and eviction are internal to each cache; callers only ever observe
//! hit or miss.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;

use heroproxy_core::Hero;

/// Hero cache bounded by entry count and freshness.
pub struct HeroStore {
    heroes: Cache<String, Arc<Hero>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl HeroStore {
    /// Create a store holding at most `max_entries` heroes, each served for
    /// at most `ttl` after its last insert.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            heroes: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Insert or overwrite a hero, resetting its freshness window.
    pub async fn insert(&self, hero: Hero) {
        self.heroes.insert(hero.id.clone(), Arc::new(hero)).await;
    }

    /// Look up a hero. Expired entries are misses.
    pub async fn get(&self, id: &str) -> Option<Arc<Hero>> {
        let result = self.heroes.get(id).await;
        if result.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Look up a hero without touching the hit/miss counters. Used by the
    /// refresh diff, which is bookkeeping rather than caller traffic.
    pub async fn peek(&self, id: &str) -> Option<Arc<Hero>> {
        self.heroes.get(id).await
    }

    /// Drop a hero from the cache.
    pub async fn evict(&self, id: &str) {
        self.heroes.invalidate(id).await;
    }

    /// Whether a live (non-expired) entry exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.heroes.contains_key(id)
    }

    /// Current cache statistics. Runs the cache's pending maintenance first
    /// so the entry count reflects completed evictions.
    pub async fn stats(&self) -> StoreStats {
        self.heroes.run_pending_tasks().await;
        StoreStats {
            entries: self.heroes.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for HeroStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeroStore")
            .field("entries", &self.heroes.entry_count())
            .finish()
    }
}

/// Store statistics exposed over the API.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Cache of resolved ID lists per normalized search key.
pub struct SearchCache {
    entries: Cache<String, Arc<Vec<String>>>,
}

impl SearchCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Vec<String>>> {
        self.entries.get(key).await
    }

    pub async fn insert(&self, key: impl Into<String>, ids: Vec<String>) {
        self.entries.insert(key.into(), Arc::new(ids)).await;
    }
}

/// Short-TTL markers for searches confirmed empty upstream.
pub struct NegativeCache {
    entries: Cache<String, ()>,
}

impl NegativeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Cache::builder().time_to_live(ttl).build(),
        }
    }

    /// Record that `key` resolved to nothing upstream.
    pub async fn mark_empty(&self, key: impl Into<String>) {
        self.entries.insert(key.into(), ()).await;
    }

    /// Whether `key` is currently known to be empty.
    pub async fn is_empty_result(&self, key: &str) -> bool {
        self.entries.get(key).await.is_some()
    }
}
