//! HeroProxy server - live cache and notification engine.
//!
//! The engine proxies a slow, unreliable upstream hero-data provider behind
//! a self-refreshing cache and fans change notifications out to subscribers.
//!
//! # Module Organization
//!
//! - [`config`] - configuration structs, loading and validation
//! - [`observability`] - tracing setup
//! - [`store`] - hero cache, search-result cache and negative cache
//! - [`monitor`] - the set of hero IDs under active refresh
//! - [`dedup`] - per-key request deduplication lock table
//! - [`rate_limit`] - upstream-guarding token bucket
//! - [`scheduler`] - periodic discovery / refresh / cleanup loop
//! - [`coordinator`] - the synchronous search path
//! - [`routes`] - HTTP surface (search, SSE subscriptions, stats, health)
//! - [`server`] - wiring and lifecycle
//!
//! # Key Invariants
//!
//! - The hero store never serves an expired entry and never exceeds its
//!   configured capacity.
//! - Monitored IDs enter only via first fetch or discovery and leave on
//!   fetch failure or cache eviction; a tick never starts while the prior
//!   one is still running.
//! - The dedup lock table holds no entry for a key once its last waiter
//!   releases.
//! - One hero's failure never aborts a refresh tick, a publish to other
//!   subscribers, or a search assembling other heroes.

pub mod config;
pub mod coordinator;
pub mod dedup;
pub mod monitor;
pub mod observability;
pub mod rate_limit;
pub mod routes;
pub mod scheduler;
pub mod server;
pub mod store;
