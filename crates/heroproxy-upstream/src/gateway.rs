//! Gateway trait describing the upstream hero-data provider.

use async_trait::async_trait;
use heroproxy_core::Hero;

use crate::error::Result;

/// Boundary to the external hero-data provider.
///
/// All calls are slow, fallible and may time out; implementations must carry
/// their own per-request timeout so no caller can hang indefinitely on one
/// call.
#[async_trait]
pub trait UpstreamGateway: Send + Sync {
    /// Fetch a single hero by ID.
    ///
    /// `Ok(None)` means the provider answered cleanly that no such hero
    /// exists. This is a valid outcome, not an error.
    async fn fetch_by_id(&self, id: &str) -> Result<Option<Hero>>;

    /// Resolve hero IDs matching a name search.
    ///
    /// An empty vector is a valid "no matches" answer.
    async fn search_by_name(&self, name: &str) -> Result<Vec<String>>;

    /// List all known hero IDs from the provider's roster.
    ///
    /// The listing is bounded by whatever page the provider serves; callers
    /// must not assume completeness.
    async fn list_all_ids(&self) -> Result<Vec<String>>;
}
