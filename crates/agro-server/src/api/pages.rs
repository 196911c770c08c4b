//! Plain-text test pages.

use axum::Router;
use axum::routing::get;

use crate::server::AppState;

/// Test page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/test/home", get(home))
        .route("/api/test/about", get(about))
}

async fn home() -> &'static str {
    "This is Home Page"
}

async fn about() -> &'static str {
    "This is About Page"
}
