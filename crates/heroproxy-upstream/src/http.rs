//! HTTP implementation of the upstream gateway.
//!
//! The provider exposes:
//! - `GET {base}/{token}/{id}` - single hero as JSON
//! - `GET {base}/{token}/search/{name}` - search results as JSON
//! - a separate roster page listing every known hero ID in an HTML table
//!
//! Responses use `"response": "success" | "error"` as their own status
//! field; an `"error"` response to a fetch is the provider's NotFound.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use heroproxy_core::Hero;

use crate::error::{Result, UpstreamError};
use crate::gateway::UpstreamGateway;

/// Matches one `<td>` roster cell holding a numeric hero ID.
static ROSTER_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<td>\s*(\d+)\s*</td>").expect("static pattern"));

/// Gateway implementation backed by the provider's HTTP API.
pub struct HttpUpstreamGateway {
    client: reqwest::Client,
    base_url: String,
    token: String,
    roster_url: String,
}

impl HttpUpstreamGateway {
    /// Create a gateway with a per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        roster_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into().trim().to_string(),
            roster_url: roster_url.into(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }
        let body = response.json::<Value>().await?;
        Ok(body)
    }

    fn is_error_response(body: &Value) -> bool {
        body.get("response").and_then(|v| v.as_str()) == Some("error")
    }
}

#[async_trait]
impl UpstreamGateway for HttpUpstreamGateway {
    async fn fetch_by_id(&self, id: &str) -> Result<Option<Hero>> {
        let url = format!("{}/{}/{}", self.base_url, self.token, id);
        tracing::debug!(hero_id = %id, "Fetching hero from upstream");

        let body = self.get_json(&url).await?;
        if Self::is_error_response(&body) {
            tracing::debug!(hero_id = %id, "Upstream reported no such hero");
            return Ok(None);
        }

        let hero: Hero = serde_json::from_value(body)
            .map_err(|e| UpstreamError::decode(format!("hero payload: {e}")))?;
        Ok(Some(hero))
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<String>> {
        let url = format!("{}/{}/search/{}", self.base_url, self.token, name);
        tracing::debug!(name = %name, "Searching upstream by name");

        let body = self.get_json(&url).await?;
        if Self::is_error_response(&body) {
            return Ok(Vec::new());
        }

        let Some(results) = body.get("results").and_then(|v| v.as_array()) else {
            return Ok(Vec::new());
        };

        let ids = results
            .iter()
            .filter_map(|hero| hero.get("id").and_then(|v| v.as_str()))
            .map(|id| id.to_string())
            .collect();
        Ok(ids)
    }

    async fn list_all_ids(&self) -> Result<Vec<String>> {
        tracing::debug!(url = %self.roster_url, "Fetching hero roster listing");

        let response = self.client.get(&self.roster_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }
        let html = response.text().await?;

        // Roster rows repeat the numeric ID cell; keep first occurrence order.
        let mut seen = std::collections::HashSet::new();
        let ids: Vec<String> = ROSTER_ID_PATTERN
            .captures_iter(&html)
            .map(|caps| caps[1].to_string())
            .filter(|id| seen.insert(id.clone()))
            .collect();

        tracing::debug!(count = ids.len(), "Parsed roster listing");
        Ok(ids)
    }
}
