//! HTTP surface: search, SSE subscriptions, cache statistics, health.
//!
//! This layer stays thin: it parses requests, maps engine errors onto
//! status codes and streams hub events out as SSE. All engine behavior
//! lives below it.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use heroproxy_core::{ChangeEvent, CoreError, ErrorCategory, Hero};
use heroproxy_notifications::{NotificationHub, Scope, SubscriptionHandle};

use crate::coordinator::SearchCoordinator;
use crate::store::HeroStore;

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SearchCoordinator>,
    pub hub: Arc<NotificationHub>,
    pub store: Arc<HeroStore>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/hero/search", get(search))
        .route("/api/hero/subscribe", get(subscribe))
        .route("/api/cache/stats", get(cache_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "up"}))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    name: String,
    page: Option<usize>,
    per_page: Option<usize>,
}

#[derive(Debug, Serialize)]
struct Pagination {
    page: usize,
    per_page: usize,
    total: usize,
}

#[derive(Debug, Serialize)]
struct SearchResponseBody {
    results: Vec<Hero>,
    pagination: Pagination,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponseBody>, ApiError> {
    let heroes = state.coordinator.search(&params.name).await?;

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params
        .per_page
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let total = heroes.len();

    let results = heroes
        .iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .map(|hero| (**hero).clone())
        .collect();

    Ok(Json(SearchResponseBody {
        results,
        pagination: Pagination {
            page,
            per_page,
            total,
        },
    }))
}

#[derive(Debug, Deserialize)]
struct SubscribeParams {
    scope: Option<String>,
    ids: Option<String>,
}

async fn subscribe(
    State(state): State<AppState>,
    Query(params): Query<SubscribeParams>,
) -> Result<Sse<KeepAliveStream<EventStream>>, ApiError> {
    let scope = parse_scope(&params)?;
    let (handle, receiver) = state.hub.subscribe(scope);

    let stream = EventStream {
        receiver,
        hub: state.hub.clone(),
        handle,
    };
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn cache_stats(State(state): State<AppState>) -> Json<crate::store::StoreStats> {
    Json(state.store.stats().await)
}

/// Translate subscription query parameters into a hub scope.
fn parse_scope(params: &SubscribeParams) -> Result<Scope, ApiError> {
    if let Some(ids) = params.ids.as_deref() {
        let ids: Vec<String> = ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            return Err(CoreError::validation("ids must contain at least one hero ID").into());
        }
        return Ok(Scope::Heroes(ids));
    }
    match params.scope.as_deref() {
        Some("all") => Ok(Scope::All),
        _ => Err(CoreError::validation("provide ids=<id,...> or scope=all").into()),
    }
}

/// SSE stream over one subscription's delivery channel.
///
/// Dropping the stream (client disconnect) unsubscribes promptly instead of
/// waiting for the hub to notice a closed channel at the next publish.
pub struct EventStream {
    receiver: mpsc::Receiver<ChangeEvent>,
    hub: Arc<NotificationHub>,
    handle: SubscriptionHandle,
}

impl Stream for EventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(change)) => {
                let event = match Event::default().event(change.kind.as_str()).json_data(&change)
                {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to serialize change event");
                        Event::default().comment("event serialization failed")
                    }
                };
                Poll::Ready(Some(Ok(event)))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.handle);
    }
}

/// Wrapper mapping engine errors onto HTTP responses.
#[derive(Debug)]
pub struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.category() {
            ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCategory::Upstream => StatusCode::BAD_GATEWAY,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let CoreError::Internal(detail) = &self.0 {
            tracing::error!(detail = %detail, "Internal error surfaced to client");
        }

        let body = Json(json!({
            "error": self.0.category().to_string(),
            // CoreError::Internal renders as a generic message; no detail leaks.
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scope_ids() {
        let params = SubscribeParams {
            scope: None,
            ids: Some("70, 644 ,".into()),
        };
        let scope = parse_scope(&params).unwrap();
        assert_eq!(scope, Scope::Heroes(vec!["70".into(), "644".into()]));
    }

    #[test]
    fn test_parse_scope_all() {
        let params = SubscribeParams {
            scope: Some("all".into()),
            ids: None,
        };
        assert_eq!(parse_scope(&params).unwrap(), Scope::All);
    }

    #[test]
    fn test_parse_scope_rejects_neither() {
        let params = SubscribeParams {
            scope: None,
            ids: None,
        };
        assert!(parse_scope(&params).is_err());
    }

    #[test]
    fn test_parse_scope_rejects_empty_ids() {
        let params = SubscribeParams {
            scope: None,
            ids: Some(" , ".into()),
        };
        assert!(parse_scope(&params).is_err());
    }
}
