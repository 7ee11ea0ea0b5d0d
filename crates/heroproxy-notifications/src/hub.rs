//! Subscriber registry and event fan-out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

use heroproxy_core::{ChangeEvent, ChangeKind, Hero};

use crate::subscription::{Scope, StateCell, SubscriptionHandle, SubscriptionState};

/// Default bound of a subscriber's delivery channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Default time budget for delivering one event to one subscriber.
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// One registered subscriber: identity, delivery channel, lifecycle state.
struct SubscriberEntry {
    id: Uuid,
    sender: mpsc::Sender<ChangeEvent>,
    state: StateCell,
}

impl SubscriberEntry {
    fn is_active(&self) -> bool {
        self.state.get() == SubscriptionState::Active
    }
}

/// Registry of active subscribers with change-event fan-out.
///
/// Registration is keyed by hero ID plus a separate wildcard list. Publish
/// iterates a snapshot of the matching lists, so concurrent subscribe and
/// unsubscribe calls never race the iteration, and a subscriber removed
/// mid-publish is simply skipped on the next event.
pub struct NotificationHub {
    /// Map from hero ID to the subscribers scoped to it
    hero_subscribers: RwLock<HashMap<String, Vec<Arc<SubscriberEntry>>>>,
    /// Subscribers receiving every event
    wildcard_subscribers: RwLock<Vec<Arc<SubscriberEntry>>>,
    send_timeout: Duration,
    channel_capacity: usize,
}

impl NotificationHub {
    /// Create a hub with default delivery bounds.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_SEND_TIMEOUT, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a hub with an explicit send timeout and channel capacity.
    pub fn with_limits(send_timeout: Duration, channel_capacity: usize) -> Self {
        Self {
            hero_subscribers: RwLock::new(HashMap::new()),
            wildcard_subscribers: RwLock::new(Vec::new()),
            send_timeout,
            channel_capacity,
        }
    }

    /// Register a subscriber and hand back its delivery channel.
    ///
    /// A `Scope::Heroes` subscriber is registered under each listed ID but
    /// still owns a single channel, so one event matching one of its IDs is
    /// delivered once.
    pub fn subscribe(&self, scope: Scope) -> (SubscriptionHandle, mpsc::Receiver<ChangeEvent>) {
        let (sender, receiver) = mpsc::channel(self.channel_capacity);
        let entry = Arc::new(SubscriberEntry {
            id: Uuid::new_v4(),
            sender,
            state: StateCell::new(),
        });

        match &scope {
            Scope::All => {
                self.wildcard_subscribers.write().push(entry.clone());
            }
            Scope::Heroes(ids) => {
                let mut map = self.hero_subscribers.write();
                let mut seen = std::collections::HashSet::new();
                for id in ids {
                    // A repeated ID in the request must not register the
                    // channel twice; one event is delivered once.
                    if seen.insert(id) {
                        map.entry(id.clone()).or_default().push(entry.clone());
                    }
                }
            }
        }

        tracing::debug!(subscription_id = %entry.id, scope = ?scope, "Subscriber registered");
        (
            SubscriptionHandle {
                id: entry.id,
                scope,
            },
            receiver,
        )
    }

    /// Remove a subscription from every list it was registered in.
    ///
    /// Idempotent: unsubscribing an already-removed handle is a no-op.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        self.cancel_and_remove(handle.id);
        tracing::debug!(subscription_id = %handle.id, "Subscriber unregistered");
    }

    /// Build and publish a change event. This is the hook used by both the
    /// refresh scheduler and the coordinator's first-fetch path.
    pub async fn notify(&self, hero_id: &str, hero: Option<Hero>, kind: ChangeKind) -> usize {
        let event = match (kind, hero) {
            (ChangeKind::New, Some(hero)) => ChangeEvent::new_hero(hero_id, hero),
            (ChangeKind::Updated, Some(hero)) => ChangeEvent::updated(hero_id, hero),
            _ => ChangeEvent::deleted(hero_id),
        };
        self.publish(event).await
    }

    /// Deliver an event to the subscribers of its hero ID and to every
    /// wildcard subscriber.
    ///
    /// Returns the number of subscribers the event was delivered to. A
    /// delivery failure (closed channel, or a send blocked past the send
    /// timeout) cancels that subscriber and removes it from the registry;
    /// it is never surfaced to the publisher.
    pub async fn publish(&self, event: ChangeEvent) -> usize {
        let targets = self.snapshot_targets(&event.hero_id);
        let mut delivered = 0;

        for entry in targets {
            if !entry.is_active() {
                continue;
            }
            let send = tokio::time::timeout(self.send_timeout, entry.sender.send(event.clone()));
            match send.await {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(_)) => {
                    tracing::debug!(
                        subscription_id = %entry.id,
                        hero_id = %event.hero_id,
                        "Subscriber channel closed, removing"
                    );
                    self.cancel_and_remove(entry.id);
                }
                Err(_) => {
                    tracing::warn!(
                        subscription_id = %entry.id,
                        hero_id = %event.hero_id,
                        timeout_ms = self.send_timeout.as_millis() as u64,
                        "Subscriber send timed out, removing"
                    );
                    self.cancel_and_remove(entry.id);
                }
            }
        }

        delivered
    }

    /// End every subscription with a terminal Completed status and clear the
    /// registries. Dropping the senders closes each subscriber's stream.
    pub fn shutdown(&self) {
        let mut map = self.hero_subscribers.write();
        let mut wildcard = self.wildcard_subscribers.write();
        for entry in map.values().flatten().chain(wildcard.iter()) {
            entry.state.transition(SubscriptionState::Completed);
        }
        map.clear();
        wildcard.clear();
        tracing::info!("Notification hub shut down");
    }

    /// Number of distinct registered subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let map = self.hero_subscribers.read();
        let wildcard = self.wildcard_subscribers.read();
        let mut seen: std::collections::HashSet<Uuid> =
            wildcard.iter().map(|e| e.id).collect();
        for entry in map.values().flatten() {
            seen.insert(entry.id);
        }
        seen.len()
    }

    /// Snapshot the subscribers an event for `hero_id` must reach.
    ///
    /// A subscription's scope is exactly one of wildcard or a hero-ID list,
    /// and a multi-ID subscription appears at most once under any single ID,
    /// so the snapshot cannot contain duplicates for one event.
    fn snapshot_targets(&self, hero_id: &str) -> Vec<Arc<SubscriberEntry>> {
        let mut targets = Vec::new();
        {
            let map = self.hero_subscribers.read();
            if let Some(entries) = map.get(hero_id) {
                targets.extend(entries.iter().cloned());
            }
        }
        {
            let wildcard = self.wildcard_subscribers.read();
            targets.extend(wildcard.iter().cloned());
        }
        targets
    }

    fn cancel_and_remove(&self, id: Uuid) {
        // Transition first so an in-flight publish skips the entry even if
        // it still holds a snapshot reference.
        {
            let map = self.hero_subscribers.read();
            let wildcard = self.wildcard_subscribers.read();
            for entry in map.values().flatten().chain(wildcard.iter()) {
                if entry.id == id {
                    entry.state.transition(SubscriptionState::Cancelled);
                }
            }
        }

        let mut map = self.hero_subscribers.write();
        for entries in map.values_mut() {
            entries.retain(|e| e.id != id);
        }
        map.retain(|_, entries| !entries.is_empty());
        drop(map);

        self.wildcard_subscribers.write().retain(|e| e.id != id);
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHub")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
