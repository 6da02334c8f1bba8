//! Health check handlers.

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;

use crate::state::AppState;

/// How long the readiness probe waits for the commerce platform.
const READINESS_TIMEOUT: Duration = Duration::from_secs(2);

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the commerce API answers at all; any HTTP status counts.
/// Returns 503 Service Unavailable if it cannot be reached.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let probe = state
        .http()
        .get(&state.config().commerce.api_url)
        .timeout(READINESS_TIMEOUT)
        .send()
        .await;

    match probe {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Commerce API unreachable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
