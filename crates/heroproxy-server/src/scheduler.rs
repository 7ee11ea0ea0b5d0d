//! Background refresh loop keeping monitored heroes fresh.
//!
//! One tick runs three ordered phases:
//! 1. **Discovery** - pull the provider's roster and admit a bounded batch
//!    of not-yet-monitored IDs.
//! 2. **Refresh** - re-fetch every monitored hero, diff against the store
//!    and publish change events.
//! 3. **Cleanup** - stop monitoring IDs the store has evicted.
//!
//! The tick body runs inline in the scheduler task and the ticker skips
//! missed ticks, so a slow tick delays the next one instead of overlapping
//! it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use heroproxy_core::ChangeKind;
use heroproxy_notifications::NotificationHub;
use heroproxy_upstream::UpstreamGateway;

use crate::monitor::MonitoredSet;
use crate::store::HeroStore;

/// Periodic refresh job over the monitored hero set.
pub struct RefreshScheduler {
    store: Arc<HeroStore>,
    gateway: Arc<dyn UpstreamGateway>,
    hub: Arc<NotificationHub>,
    monitored: Arc<MonitoredSet>,
    tick_interval: Duration,
    discovery_batch_size: usize,
}

impl RefreshScheduler {
    pub fn new(
        store: Arc<HeroStore>,
        gateway: Arc<dyn UpstreamGateway>,
        hub: Arc<NotificationHub>,
        monitored: Arc<MonitoredSet>,
        tick_interval: Duration,
        discovery_batch_size: usize,
    ) -> Self {
        Self {
            store,
            gateway,
            hub,
            monitored,
            tick_interval,
            discovery_batch_size,
        }
    }

    /// Start the scheduler in a background task.
    ///
    /// Returns a shutdown sender that can be used to stop the scheduler.
    pub fn start(self) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            info!(
                interval_secs = self.tick_interval.as_secs(),
                discovery_batch_size = self.discovery_batch_size,
                "Refresh scheduler started"
            );

            let mut ticker = interval(self.tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of a tokio interval fires immediately; consume
            // it so the first real tick happens one interval after startup.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_tick().await;
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("Refresh scheduler shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Execute one full tick: discovery, refresh, cleanup, in that order.
    pub async fn run_tick(&self) {
        debug!(monitored = self.monitored.len(), "Starting refresh tick");
        self.discover().await;
        self.refresh_monitored().await;
        self.cleanup().await;
        debug!(monitored = self.monitored.len(), "Refresh tick finished");
    }

    /// Admit at most `discovery_batch_size` new IDs from the roster. The
    /// cap throttles a large backlog (think first tick against a provider
    /// with thousands of heroes) instead of swamping the refresh phase.
    async fn discover(&self) {
        let ids = match self.gateway.list_all_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Roster listing failed, skipping discovery");
                return;
            }
        };

        let mut admitted = 0usize;
        for id in ids {
            if admitted >= self.discovery_batch_size {
                break;
            }
            if self.monitored.add(id.clone()) {
                debug!(hero_id = %id, "Discovered new hero, monitoring");
                admitted += 1;
            }
        }

        if admitted > 0 {
            info!(admitted, "Discovery admitted new heroes");
        }
    }

    /// Re-fetch every monitored hero and publish diffs. One hero's failure
    /// never aborts the rest of the tick.
    async fn refresh_monitored(&self) {
        for id in self.monitored.snapshot() {
            match self.gateway.fetch_by_id(&id).await {
                Err(e) => {
                    // No retries here. The ID comes back only via
                    // rediscovery or a fresh request.
                    error!(hero_id = %id, error = %e, "Refresh fetch failed, dropping from monitoring");
                    self.monitored.remove(&id);
                }
                Ok(None) => {
                    if self.store.contains(&id) {
                        info!(hero_id = %id, "Hero gone upstream, evicting");
                        self.store.evict(&id).await;
                        self.hub.notify(&id, None, ChangeKind::Deleted).await;
                    }
                    self.monitored.remove(&id);
                }
                Ok(Some(fetched)) => match self.store.peek(&id).await {
                    None => {
                        self.store.insert(fetched.clone()).await;
                        info!(hero_id = %id, "New hero cached");
                        self.hub.notify(&id, Some(fetched), ChangeKind::New).await;
                    }
                    Some(cached) if *cached != fetched => {
                        self.store.insert(fetched.clone()).await;
                        info!(hero_id = %id, "Hero changed, cache updated");
                        self.hub
                            .notify(&id, Some(fetched), ChangeKind::Updated)
                            .await;
                    }
                    Some(_) => {
                        debug!(hero_id = %id, "No changes detected");
                    }
                },
            }
        }
    }

    /// Drop monitoring for IDs the store no longer holds (TTL or capacity
    /// eviction).
    async fn cleanup(&self) {
        for id in self.monitored.snapshot() {
            if !self.store.contains(&id) {
                info!(hero_id = %id, "Hero evicted from cache, dropping from monitoring");
                self.monitored.remove(&id);
            }
        }
    }
}
