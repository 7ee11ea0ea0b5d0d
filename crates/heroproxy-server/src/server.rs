//! Component wiring and server lifecycle.

use std::sync::Arc;

use anyhow::Context;

use heroproxy_notifications::NotificationHub;
use heroproxy_upstream::{HttpUpstreamGateway, UpstreamGateway};

use crate::config::AppConfig;
use crate::coordinator::SearchCoordinator;
use crate::monitor::MonitoredSet;
use crate::rate_limit::RateLimiter;
use crate::routes::{self, AppState};
use crate::scheduler::RefreshScheduler;
use crate::store::{HeroStore, NegativeCache, SearchCache};

/// Build everything against the real HTTP gateway and serve until shutdown.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let gateway: Arc<dyn UpstreamGateway> = Arc::new(
        HttpUpstreamGateway::new(
            &config.upstream.base_url,
            &config.upstream.token,
            &config.upstream.roster_url,
            config.upstream.request_timeout(),
        )
        .context("building upstream gateway")?,
    );
    serve_with_gateway(config, gateway).await
}

/// Serve with an externally supplied gateway (used by tests and tooling).
pub async fn serve_with_gateway(
    config: AppConfig,
    gateway: Arc<dyn UpstreamGateway>,
) -> anyhow::Result<()> {
    let store = Arc::new(HeroStore::new(config.cache.max_entries, config.cache.ttl()));
    let search_cache = Arc::new(SearchCache::new(config.cache.max_entries, config.cache.ttl()));
    let negative = Arc::new(NegativeCache::new(config.cache.negative_ttl()));
    let monitored = Arc::new(MonitoredSet::new());
    let hub = Arc::new(NotificationHub::with_limits(
        config.notifications.send_timeout(),
        config.notifications.channel_capacity,
    ));

    let scheduler = RefreshScheduler::new(
        store.clone(),
        gateway.clone(),
        hub.clone(),
        monitored.clone(),
        config.refresh.interval(),
        config.refresh.discovery_batch_size,
    );
    let scheduler_shutdown = scheduler.start();

    let coordinator = Arc::new(SearchCoordinator::new(
        store.clone(),
        search_cache,
        negative,
        gateway,
        hub.clone(),
        monitored,
        RateLimiter::new(
            config.rate_limit.permits_per_second,
            config.rate_limit.burst,
        ),
    ));

    let state = AppState {
        coordinator,
        hub: hub.clone(),
        store,
    };
    let app = routes::router(state);

    let addr = config
        .server
        .bind_addr()
        .map_err(|e| anyhow::anyhow!(e))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(address = %addr, "HeroProxy listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    tracing::info!("Shutting down");
    let _ = scheduler_shutdown.send(true);
    hub.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
