//! The synchronous search path.
//!
//! Every inbound search runs the same gauntlet before it is allowed to
//! touch the upstream: rate-limit permit, input validation, negative-cache
//! fast path, per-key dedup lock, then a re-check of both caches once the
//! lock is held (a co-waiter may have just finished the identical request).

use std::sync::Arc;

use tracing::{debug, warn};

use heroproxy_core::{ChangeKind, CoreError, Hero};
use heroproxy_notifications::NotificationHub;
use heroproxy_upstream::UpstreamGateway;

use crate::dedup::RequestDeduper;
use crate::monitor::MonitoredSet;
use crate::rate_limit::RateLimiter;
use crate::store::{HeroStore, NegativeCache, SearchCache};

/// Longest accepted search input after trimming.
const MAX_NAME_LEN: usize = 128;

/// Coordinates inbound searches against cache, upstream and monitoring.
pub struct SearchCoordinator {
    store: Arc<HeroStore>,
    search_cache: Arc<SearchCache>,
    negative: Arc<NegativeCache>,
    gateway: Arc<dyn UpstreamGateway>,
    hub: Arc<NotificationHub>,
    monitored: Arc<MonitoredSet>,
    rate_limiter: RateLimiter,
    deduper: RequestDeduper,
}

impl SearchCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<HeroStore>,
        search_cache: Arc<SearchCache>,
        negative: Arc<NegativeCache>,
        gateway: Arc<dyn UpstreamGateway>,
        hub: Arc<NotificationHub>,
        monitored: Arc<MonitoredSet>,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            store,
            search_cache,
            negative,
            gateway,
            hub,
            monitored,
            rate_limiter,
            deduper: RequestDeduper::new(),
        }
    }

    /// Search heroes by name.
    ///
    /// Returns the matching heroes (possibly empty - a clean "nothing
    /// found" is success, not an error). Errors only surface when neither a
    /// cached nor a negative-cached answer can substitute for a failing
    /// upstream.
    pub async fn search(&self, name: &str) -> Result<Vec<Arc<Hero>>, CoreError> {
        if !self.rate_limiter.try_acquire() {
            return Err(CoreError::RateLimited);
        }

        let key = normalize(name)?;

        if self.negative.is_empty_result(&key).await {
            debug!(key = %key, "Negative cache hit, skipping upstream");
            return Ok(Vec::new());
        }
        if let Some(ids) = self.search_cache.get(&key).await {
            debug!(key = %key, "Search cache hit");
            return self.assemble(&key, &ids).await;
        }

        let _guard = self.deduper.acquire(&key).await;

        // Re-check both caches: a co-waiter holding the lock before us may
        // have resolved this exact key already.
        if self.negative.is_empty_result(&key).await {
            debug!(key = %key, "Negative cache hit after lock");
            return Ok(Vec::new());
        }
        if let Some(ids) = self.search_cache.get(&key).await {
            debug!(key = %key, "Search cache hit after lock");
            return self.assemble(&key, &ids).await;
        }

        let ids = self
            .gateway
            .search_by_name(&key)
            .await
            .map_err(|e| CoreError::upstream(e.to_string()))?;

        if ids.is_empty() {
            debug!(key = %key, "Upstream returned no matches, negative-caching");
            self.negative.mark_empty(key).await;
            return Ok(Vec::new());
        }

        self.search_cache.insert(key.clone(), ids.clone()).await;
        self.assemble(&key, &ids).await
    }

    /// Resolve each ID through the store, fetching misses from upstream.
    async fn assemble(&self, key: &str, ids: &[String]) -> Result<Vec<Arc<Hero>>, CoreError> {
        let mut results = Vec::with_capacity(ids.len());
        let mut last_error = None;

        for id in ids {
            match self.get_or_fetch(id).await {
                Ok(Some(hero)) => results.push(hero),
                Ok(None) => debug!(hero_id = %id, "Resolved ID no longer exists upstream"),
                Err(e) => {
                    warn!(hero_id = %id, error = %e, "Fetch failed while assembling results");
                    last_error = Some(e);
                }
            }
        }

        if results.is_empty() {
            // Every resolved ID came up empty; remember that so the next
            // caller inside the negative TTL skips the upstream entirely.
            self.negative.mark_empty(key.to_string()).await;
            if let Some(error) = last_error {
                return Err(error);
            }
        }

        Ok(results)
    }

    /// Cache lookup with upstream fallback. A first successful fetch
    /// registers the hero for monitoring and publishes its New event.
    async fn get_or_fetch(&self, id: &str) -> Result<Option<Arc<Hero>>, CoreError> {
        if let Some(hero) = self.store.get(id).await {
            return Ok(Some(hero));
        }

        let fetched = self
            .gateway
            .fetch_by_id(id)
            .await
            .map_err(|e| CoreError::upstream(e.to_string()))?;

        match fetched {
            Some(hero) => {
                self.store.insert(hero.clone()).await;
                if self.monitored.add(id) {
                    debug!(hero_id = %id, "Hero registered for monitoring");
                }
                self.hub
                    .notify(id, Some(hero.clone()), ChangeKind::New)
                    .await;
                Ok(Some(Arc::new(hero)))
            }
            None => Ok(None),
        }
    }

    /// Number of live dedup lock entries (operational introspection).
    pub fn dedup_entry_count(&self) -> usize {
        self.deduper.entry_count()
    }
}

/// Case-fold and validate a search name into its cache/dedup key.
fn normalize(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("search name must not be empty"));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(CoreError::validation(format!(
            "search name longer than {MAX_NAME_LEN} bytes"
        )));
    }
    Ok(trimmed.to_lowercase())
}
