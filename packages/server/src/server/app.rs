//! Application setup and server configuration.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::domains::tickets::webhook::{self, WebhookState};
use crate::kernel::ServerDeps;
use crate::server::routes::health_handler;

/// Build the Axum application router
///
/// - `POST /webhook` - reactive duplicate check for one ticket
/// - `GET /health` - liveness probe
pub fn build_app(deps: ServerDeps) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(webhook::router(WebhookState { deps }))
        .layer(TraceLayer::new_for_http())
}
