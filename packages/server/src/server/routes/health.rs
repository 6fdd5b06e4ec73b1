use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: &'static str,
}

/// Health check endpoint
///
/// Liveness only: no CRM call is made, so a HubSpot outage does not take the
/// service out of rotation. Always returns 200 OK.
pub async fn health_handler() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
