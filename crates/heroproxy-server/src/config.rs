//! Configuration for the HeroProxy server.
//!
//! Configuration is layered: a TOML file (`heroproxy.toml` by default, or
//! the path given via `--config` / `HEROPROXY_CONFIG`), overridden by
//! `HEROPROXY__`-prefixed environment variables (`HEROPROXY__SERVER__PORT`,
//! `HEROPROXY__UPSTREAM__TOKEN`, ...).

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.upstream.base_url.is_empty() {
            return Err("upstream.base_url must be set".into());
        }
        if self.upstream.token.is_empty() {
            return Err("upstream.token must be set".into());
        }
        if self.upstream.request_timeout_ms == 0 {
            return Err("upstream.request_timeout_ms must be > 0".into());
        }
        if self.cache.max_entries == 0 {
            return Err("cache.max_entries must be > 0".into());
        }
        if self.cache.ttl_secs == 0 || self.cache.negative_ttl_secs == 0 {
            return Err("cache TTLs must be > 0".into());
        }
        if self.refresh.interval_secs == 0 {
            return Err("refresh.interval_secs must be > 0".into());
        }
        if self.refresh.discovery_batch_size == 0 {
            return Err("refresh.discovery_batch_size must be > 0".into());
        }
        if self.rate_limit.permits_per_second <= 0.0 {
            return Err("rate_limit.permits_per_second must be > 0".into());
        }
        if self.rate_limit.burst < 1.0 {
            return Err("rate_limit.burst must be >= 1".into());
        }
        if self.notifications.send_timeout_ms == 0 {
            return Err("notifications.send_timeout_ms must be > 0".into());
        }
        if self.notifications.channel_capacity == 0 {
            return Err("notifications.channel_capacity must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| format!("invalid server address: {e}"))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the provider API, without trailing slash
    #[serde(default = "default_upstream_url")]
    pub base_url: String,
    /// Provider API token, placed in the URL path
    #[serde(default)]
    pub token: String,
    /// Roster page listing all hero IDs
    #[serde(default = "default_roster_url")]
    pub roster_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            token: String::new(),
            roster_url: default_roster_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Freshness window for cached heroes and search results
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    /// Capacity bound of the hero cache
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: u64,
    /// Independent, shorter freshness window for confirmed-empty searches
    #[serde(default = "default_negative_ttl_secs")]
    pub negative_ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn negative_ttl(&self) -> Duration {
        Duration::from_secs(self.negative_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
            negative_ttl_secs: default_negative_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between refresh ticks
    #[serde(default = "default_refresh_interval_secs")]
    pub interval_secs: u64,
    /// Maximum newly discovered IDs admitted into monitoring per tick
    #[serde(default = "default_discovery_batch_size")]
    pub discovery_batch_size: usize,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_refresh_interval_secs(),
            discovery_batch_size: default_discovery_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_permits_per_second")]
    pub permits_per_second: f64,
    /// Maximum permits accumulated while idle
    #[serde(default = "default_burst")]
    pub burst: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            permits_per_second: default_permits_per_second(),
            burst: default_burst(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Per-subscriber delivery budget before the subscriber is cancelled
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Bound of each subscriber's delivery channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl NotificationsConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: default_send_timeout_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_upstream_url() -> String {
    "https://superheroapi.com/api".to_string()
}
fn default_roster_url() -> String {
    "https://superheroapi.com/ids.html".to_string()
}
fn default_request_timeout_ms() -> u64 {
    5_000
}
fn default_cache_ttl_secs() -> u64 {
    3_600
}
fn default_cache_max_entries() -> u64 {
    10_000
}
fn default_negative_ttl_secs() -> u64 {
    60
}
fn default_refresh_interval_secs() -> u64 {
    300
}
fn default_discovery_batch_size() -> usize {
    20
}
fn default_permits_per_second() -> f64 {
    10.0
}
fn default_burst() -> f64 {
    10.0
}
fn default_send_timeout_ms() -> u64 {
    5_000
}
fn default_channel_capacity() -> usize {
    64
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from an optional TOML file plus environment overrides.
///
/// When `path` is None the default `heroproxy.toml` is used if present;
/// an explicitly given path must exist.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();
    match path {
        Some(p) => {
            builder = builder.add_source(config::File::with_name(p));
        }
        None => {
            builder = builder.add_source(config::File::with_name("heroproxy").required(false));
        }
    }
    builder = builder.add_source(
        config::Environment::with_prefix("HEROPROXY")
            .prefix_separator("__")
            .separator("__"),
    );
    builder.build()?.try_deserialize()
}
