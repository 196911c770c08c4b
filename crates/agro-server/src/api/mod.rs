//! REST API under `/api`, one module per route group.
//!
//! Each group sits behind its own [`RateLimiter`](crate::rate_limit::RateLimiter).

pub mod ai;
pub mod inventory;
pub mod pages;
pub mod users;

use agro_store::{PooledConnection, StoreError};
use axum::Router;
use axum::middleware::from_fn_with_state;
use bytes::Bytes;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::rate_limit::{RateLimiters, enforce};
use crate::server::AppState;

/// All API routes with their rate limits applied.
pub fn routes(limiters: &RateLimiters) -> Router<AppState> {
    Router::new()
        .merge(users::routes().route_layer(from_fn_with_state(limiters.users.clone(), enforce)))
        .merge(
            inventory::routes()
                .route_layer(from_fn_with_state(limiters.inventory.clone(), enforce)),
        )
        .merge(ai::routes().route_layer(from_fn_with_state(limiters.ai.clone(), enforce)))
        .merge(pages::routes().route_layer(from_fn_with_state(limiters.test.clone(), enforce)))
}

/// Check a connection out of the pool.
pub(crate) fn db(state: &AppState) -> ApiResult<PooledConnection> {
    state.pool.get().map_err(|e| StoreError::from(e).into())
}

/// Request body as JSON; an empty or malformed body reads as `null`.
pub(crate) fn json_body(bytes: &Bytes) -> Value {
    serde_json::from_slice(bytes).unwrap_or(Value::Null)
}

/// A non-empty string field.
pub(crate) fn str_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)?.as_str().filter(|s| !s.is_empty())
}

/// Run CPU-bound work on the blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(ApiError::internal)
}
