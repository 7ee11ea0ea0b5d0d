//! End-to-end engine tests against a programmable in-memory gateway.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use heroproxy_core::{ChangeEvent, ChangeKind, CoreError, Hero};
use heroproxy_notifications::{NotificationHub, Scope};
use heroproxy_server::coordinator::SearchCoordinator;
use heroproxy_server::monitor::MonitoredSet;
use heroproxy_server::rate_limit::RateLimiter;
use heroproxy_server::scheduler::RefreshScheduler;
use heroproxy_server::store::{HeroStore, NegativeCache, SearchCache};
use heroproxy_upstream::{UpstreamError, UpstreamGateway};

/// In-memory gateway with scripted data and call counters.
#[derive(Default)]
struct MockGateway {
    /// Upstream truth: hero ID to current value
    heroes: Mutex<HashMap<String, Hero>>,
    /// Name search results: normalized name to IDs
    search_results: Mutex<HashMap<String, Vec<String>>>,
    /// Roster listing served to discovery
    roster: Mutex<Vec<String>>,
    /// IDs whose fetch fails with a transport-level error
    failing: Mutex<HashSet<String>>,
    /// Synthesize a hero for any ID not explicitly scripted
    synthesize_missing: Mutex<bool>,
    /// Artificial latency for name searches
    search_delay: Mutex<Option<Duration>>,

    fetch_calls: AtomicUsize,
    search_calls: AtomicUsize,
    roster_calls: AtomicUsize,
}

impl MockGateway {
    fn with_hero(self, hero: Hero) -> Self {
        self.heroes.lock().insert(hero.id.clone(), hero);
        self
    }

    fn with_search(self, name: &str, ids: &[&str]) -> Self {
        self.search_results
            .lock()
            .insert(name.to_string(), ids.iter().map(|s| s.to_string()).collect());
        self
    }

    fn set_hero(&self, hero: Hero) {
        self.heroes.lock().insert(hero.id.clone(), hero);
    }

    fn remove_hero(&self, id: &str) {
        self.heroes.lock().remove(id);
    }

    fn fail_fetches_for(&self, id: &str) {
        self.failing.lock().insert(id.to_string());
    }

    fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamGateway for MockGateway {
    async fn fetch_by_id(&self, id: &str) -> Result<Option<Hero>, UpstreamError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().contains(id) {
            return Err(UpstreamError::Status(500));
        }
        if let Some(hero) = self.heroes.lock().get(id) {
            return Ok(Some(hero.clone()));
        }
        if *self.synthesize_missing.lock() {
            return Ok(Some(Hero::new(id, format!("hero-{id}"))));
        }
        Ok(None)
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<String>, UpstreamError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.search_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .search_results
            .lock()
            .get(name)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_all_ids(&self) -> Result<Vec<String>, UpstreamError> {
        self.roster_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.roster.lock().clone())
    }
}

struct Engine {
    gateway: Arc<MockGateway>,
    store: Arc<HeroStore>,
    monitored: Arc<MonitoredSet>,
    hub: Arc<NotificationHub>,
    coordinator: Arc<SearchCoordinator>,
    scheduler: RefreshScheduler,
}

fn engine(gateway: MockGateway) -> Engine {
    engine_with(gateway, 20, 1_000.0, 1_000.0)
}

fn engine_with(
    gateway: MockGateway,
    discovery_batch_size: usize,
    permits_per_second: f64,
    burst: f64,
) -> Engine {
    let gateway = Arc::new(gateway);
    let store = Arc::new(HeroStore::new(1_024, Duration::from_secs(300)));
    let search_cache = Arc::new(SearchCache::new(1_024, Duration::from_secs(300)));
    let negative = Arc::new(NegativeCache::new(Duration::from_secs(300)));
    let monitored = Arc::new(MonitoredSet::new());
    let hub = Arc::new(NotificationHub::with_limits(
        Duration::from_millis(500),
        64,
    ));

    let coordinator = Arc::new(SearchCoordinator::new(
        store.clone(),
        search_cache,
        negative,
        gateway.clone(),
        hub.clone(),
        monitored.clone(),
        RateLimiter::new(permits_per_second, burst),
    ));
    let scheduler = RefreshScheduler::new(
        store.clone(),
        gateway.clone(),
        hub.clone(),
        monitored.clone(),
        Duration::from_secs(3_600),
        discovery_batch_size,
    );

    Engine {
        gateway,
        store,
        monitored,
        hub,
        coordinator,
        scheduler,
    }
}

/// Collect everything currently buffered in a subscription channel. All
/// publishes complete inside the awaited call that caused them, so this is
/// deterministic.
fn drain(rx: &mut mpsc::Receiver<ChangeEvent>) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_first_fetch_emits_exactly_one_new_event() {
    let engine = engine(
        MockGateway::default()
            .with_hero(Hero::new("42", "Atom"))
            .with_search("atom", &["42"]),
    );
    let (_h, mut rx) = engine.hub.subscribe(Scope::All);

    let results = engine.coordinator.search("Atom").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "42");

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ChangeKind::New);
    assert_eq!(events[0].hero_id, "42");

    // First fetch registered the hero for monitoring.
    assert!(engine.monitored.contains("42"));
}

#[tokio::test]
async fn test_refresh_diff_emits_exactly_one_updated_event() {
    let engine = engine(
        MockGateway::default()
            .with_hero(Hero::new("42", "Atom"))
            .with_search("atom", &["42"]),
    );
    engine.coordinator.search("Atom").await.unwrap();

    let (_h, mut rx) = engine.hub.subscribe(Scope::All);

    let mut changed = Hero::new("42", "Atom");
    changed.powerstats.strength = "90".into();
    engine.gateway.set_hero(changed.clone());

    engine.scheduler.run_tick().await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ChangeKind::Updated);
    assert_eq!(events[0].hero_id, "42");

    // The store holds the new value afterwards.
    assert_eq!(*engine.store.peek("42").await.unwrap(), changed);
}

#[tokio::test]
async fn test_unchanged_refresh_emits_nothing() {
    let engine = engine(
        MockGateway::default()
            .with_hero(Hero::new("42", "Atom"))
            .with_search("atom", &["42"]),
    );
    engine.coordinator.search("Atom").await.unwrap();

    let (_h, mut rx) = engine.hub.subscribe(Scope::All);
    engine.scheduler.run_tick().await;

    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_concurrent_identical_searches_hit_upstream_once() {
    let engine = engine(
        MockGateway::default()
            .with_hero(Hero::new("70", "Batman"))
            .with_search("batman", &["70"]),
    );
    *engine.gateway.search_delay.lock() = Some(Duration::from_millis(50));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let coordinator = engine.coordinator.clone();
        handles.push(tokio::spawn(
            async move { coordinator.search("Batman").await },
        ));
    }
    for handle in handles {
        let results = handle.await.unwrap().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "70");
    }

    assert_eq!(engine.gateway.search_calls(), 1);
    // No dedup entry survives once every caller has finished.
    assert_eq!(engine.coordinator.dedup_entry_count(), 0);
}

#[tokio::test]
async fn test_negative_cache_stops_repeat_upstream_misses() {
    let engine = engine(MockGateway::default());

    let first = engine.coordinator.search("Ghost").await.unwrap();
    assert!(first.is_empty());
    assert_eq!(engine.gateway.search_calls(), 1);

    // Different spelling, same normalized key.
    let second = engine.coordinator.search("  GHOST ").await.unwrap();
    assert!(second.is_empty());
    assert_eq!(engine.gateway.search_calls(), 1);
}

#[tokio::test]
async fn test_fan_out_scopes() {
    let engine = engine(MockGateway::default().with_hero(Hero::new("42", "Atom")));
    engine.monitored.add("42");

    let (_h42, mut rx42) = engine.hub.subscribe(Scope::hero("42"));
    let (_h7, mut rx7) = engine.hub.subscribe(Scope::hero("7"));
    let (_hall, mut rx_all) = engine.hub.subscribe(Scope::All);

    engine.scheduler.run_tick().await;

    let for42 = drain(&mut rx42);
    assert_eq!(for42.len(), 1);
    assert_eq!(for42[0].hero_id, "42");

    let for_all = drain(&mut rx_all);
    assert_eq!(for_all.len(), 1);
    assert_eq!(for_all[0].hero_id, "42");

    assert!(drain(&mut rx7).is_empty());
}

#[tokio::test]
async fn test_closed_subscriber_never_blocks_delivery() {
    let engine = engine(MockGateway::default().with_hero(Hero::new("42", "Atom")));
    engine.monitored.add("42");

    let (_dead, dead_rx) = engine.hub.subscribe(Scope::hero("42"));
    drop(dead_rx);
    let (_live, mut live_rx) = engine.hub.subscribe(Scope::hero("42"));

    engine.scheduler.run_tick().await;

    let events = drain(&mut live_rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ChangeKind::New);
}

#[tokio::test]
async fn test_discovery_admits_at_most_batch_size() {
    let gateway = MockGateway::default();
    *gateway.roster.lock() = (1..=500).map(|i| i.to_string()).collect();
    *gateway.synthesize_missing.lock() = true;

    let engine = engine_with(gateway, 20, 1_000.0, 1_000.0);
    assert!(engine.monitored.is_empty());

    engine.scheduler.run_tick().await;
    assert_eq!(engine.monitored.len(), 20);
}

#[tokio::test]
async fn test_failed_fetch_drops_hero_from_monitoring() {
    let engine = engine(MockGateway::default().with_hero(Hero::new("42", "Atom")));
    engine.monitored.add("42");
    engine.gateway.fail_fetches_for("42");

    engine.scheduler.run_tick().await;
    assert!(!engine.monitored.contains("42"));

    // Stays absent on the next tick unless something re-adds it.
    engine.scheduler.run_tick().await;
    assert!(!engine.monitored.contains("42"));
}

#[tokio::test]
async fn test_upstream_disappearance_evicts_and_notifies_deleted() {
    let engine = engine(
        MockGateway::default()
            .with_hero(Hero::new("42", "Atom"))
            .with_search("atom", &["42"]),
    );
    engine.coordinator.search("Atom").await.unwrap();
    let (_h, mut rx) = engine.hub.subscribe(Scope::All);

    engine.gateway.remove_hero("42");
    engine.scheduler.run_tick().await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ChangeKind::Deleted);
    assert!(events[0].hero.is_none());

    assert!(!engine.store.contains("42"));
    assert!(!engine.monitored.contains("42"));
}

#[tokio::test]
async fn test_rate_limiter_fails_fast() {
    // Refill is effectively zero within the test's lifetime.
    let engine = engine_with(MockGateway::default(), 20, 0.001, 1.0);

    assert!(engine.coordinator.search("anyone").await.is_ok());
    let err = engine.coordinator.search("anyone").await.unwrap_err();
    assert!(matches!(err, CoreError::RateLimited));
}

#[tokio::test]
async fn test_all_fetches_failing_surfaces_upstream_error_once() {
    let engine = engine(MockGateway::default().with_search("doom", &["1", "2"]));
    engine.gateway.fail_fetches_for("1");
    engine.gateway.fail_fetches_for("2");

    let err = engine.coordinator.search("Doom").await.unwrap_err();
    assert!(matches!(err, CoreError::UpstreamUnavailable(_)));
    assert_eq!(engine.gateway.search_calls(), 1);

    // The failure was negative-cached: the retry is an empty success that
    // never reaches the upstream.
    let results = engine.coordinator.search("Doom").await.unwrap();
    assert!(results.is_empty());
    assert_eq!(engine.gateway.search_calls(), 1);
}

#[tokio::test]
async fn test_validation_rejects_blank_names() {
    let engine = engine(MockGateway::default());
    let err = engine.coordinator.search("   ").await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(engine.gateway.search_calls(), 0);
}

#[tokio::test]
async fn test_cached_search_skips_upstream_entirely() {
    let engine = engine(
        MockGateway::default()
            .with_hero(Hero::new("70", "Batman"))
            .with_search("batman", &["70"]),
    );

    engine.coordinator.search("Batman").await.unwrap();
    let fetches = engine.gateway.fetch_calls.load(Ordering::SeqCst);

    let results = engine.coordinator.search("BATMAN").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(engine.gateway.search_calls(), 1);
    assert_eq!(engine.gateway.fetch_calls.load(Ordering::SeqCst), fetches);
}
