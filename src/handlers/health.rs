//! Health check endpoint.

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use tracing::instrument;

use crate::state::AppState;

/// Response body for `GET /v1/healthcheck`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    system_info: SystemInfo,
}

#[derive(Debug, Serialize)]
struct SystemInfo {
    environment: String,
    version: &'static str,
    uptime_seconds: u64,
}

/// Health check endpoint.
///
/// Always returns 200 OK while the process is serving. Useful for load
/// balancer checks and smoke tests.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "available",
///   "system_info": {
///     "environment": "development",
///     "version": "0.1.0",
///     "uptime_seconds": 3600
///   }
/// }
/// ```
#[instrument(skip(state))]
pub async fn healthcheck(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "available",
        system_info: SystemInfo {
            environment: state.config.environment.clone(),
            version: env!("CARGO_PKG_VERSION"),
            uptime_seconds: state.uptime_seconds(),
        },
    })
}
