//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::health::{CheckStatus, HealthReport};
use crate::state::AppState;

/// Map an overall status to the response code.
#[must_use]
pub const fn status_code(status: CheckStatus) -> StatusCode {
    match status {
        CheckStatus::Ok => StatusCode::OK,
        CheckStatus::Warning => StatusCode::TOO_MANY_REQUESTS,
        CheckStatus::Critical => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Health check handler.
///
/// # Example
///
/// ```text
/// GET /health
///
/// Response: 200 OK
/// {
///   "status": "OK",
///   "version": "0.1.0",
///   "checks": [{ "name": "Store", "status": "OK", "message": "Store is ok", ... }]
/// }
/// ```
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let report: HealthReport = state.health.snapshot();
    (status_code(report.status), Json(report))
}
