//! Upstream gateway for HeroProxy.
//!
//! The rest of the system talks to the slow, unreliable hero-data provider
//! exclusively through the [`UpstreamGateway`] trait. The production
//! implementation is [`HttpUpstreamGateway`]; tests substitute programmable
//! fakes.
//!
//! Retry and circuit-breaking policy deliberately do not live here: every
//! call either succeeds, reports a clean NotFound, or fails, and the callers
//! decide what a failure means for them.

pub mod error;
pub mod gateway;
pub mod http;

pub use error::UpstreamError;
pub use gateway::UpstreamGateway;
pub use http::HttpUpstreamGateway;
