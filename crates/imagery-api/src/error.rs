//! API and service error types.
//!
//! `ApiError` is the client-facing error returned by handlers. The remaining
//! types describe operational failures of the service itself: acquiring and
//! releasing dependencies, registering health checks and shutting down.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use imagery_control::ControlError;
use imagery_store::StoreError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with the current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invalid request body or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::ImageNotFound(_) | ControlError::DownloadNotFound { .. } => {
                Self::NotFound(err.to_string())
            }
            ControlError::Validation(e) => Self::BadRequest(e.to_string()),
            ControlError::DownloadAlreadyExists { .. }
            | ControlError::ImageTransitionDenied { .. }
            | ControlError::DownloadTransitionDenied { .. } => Self::Conflict(err.to_string()),
            ControlError::Store(store_err) => {
                tracing::error!(error = %store_err, "Store error");
                Self::Internal("storage error".to_string())
            }
            ControlError::Producer(msg) => {
                tracing::error!(error = %msg, "Producer error");
                Self::Internal("failed to send event".to_string())
            }
        }
    }
}

// =============================================================================
// Service errors
// =============================================================================

/// A dependency owned by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    /// The HTTP listener.
    Listener,
    /// The document store.
    Store,
    /// The permissions API health client.
    Permissions,
    /// The producer for the image-uploaded topic.
    UploadedProducer,
    /// The producer for the static-file-published topic.
    PublishedProducer,
    /// The health monitor.
    HealthMonitor,
    /// The image request service.
    ImageService,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Listener => "listener",
            Self::Store => "store",
            Self::Permissions => "permissions client",
            Self::UploadedProducer => "uploaded producer",
            Self::PublishedProducer => "published producer",
            Self::HealthMonitor => "health monitor",
            Self::ImageService => "image service",
        };
        f.write_str(name)
    }
}

/// Failure reported by a dependency handle.
#[derive(Debug, Error)]
pub enum DependencyError {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// HTTP client error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error (binding or serving).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote end answered with an unexpected status.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// The response status.
        status: u16,
        /// The requested URL.
        url: String,
    },

    /// The operation did not finish in time.
    #[error("timed out")]
    Timeout,

    /// The dependency is not usable.
    #[error("{0}")]
    Unavailable(String),
}

/// A failure to register a health check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HealthError {
    /// Check names must not be empty.
    #[error("health check name is empty")]
    EmptyName,

    /// A check with this name is already registered.
    #[error("health check {0} is already registered")]
    DuplicateCheck(String),

    /// The monitor refused the check.
    #[error("health check {name} rejected: {reason}")]
    Rejected {
        /// The check name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// A release step that failed during shutdown.
#[derive(Debug, Error)]
#[error("failed to release {dependency}: {source}")]
pub struct ReleaseFailure {
    /// The dependency being released.
    pub dependency: Dependency,
    /// The reported failure.
    pub source: DependencyError,
}

/// Operational errors of the service lifecycle.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A dependency could not be acquired during startup.
    #[error("failed to acquire {dependency}: {source}")]
    Acquire {
        /// The dependency being acquired.
        dependency: Dependency,
        /// The underlying failure.
        source: DependencyError,
    },

    /// One or more health checks could not be registered.
    #[error("failed to register {} health check(s): {}", .0.len(), join(.0))]
    RegisterChecks(Vec<HealthError>),

    /// One or more dependencies failed to release.
    #[error("failed to shut down cleanly: {}", join(.0))]
    Shutdown(Vec<ReleaseFailure>),

    /// Shutdown did not finish within the configured timeout.
    #[error("did not shut down gracefully within the timeout")]
    ShutdownTimeout,

    /// The shutdown task ended without reporting an outcome.
    #[error("shutdown task ended without reporting")]
    ShutdownAborted,

    /// The listener failed after startup.
    #[error("listener error: {0}")]
    Listener(DependencyError),
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
