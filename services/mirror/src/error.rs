//! services/mirror/src/error.rs
//!
//! Defines the primary error type for the entire mirror service.
//!
//! Nothing is allowed to escape the interception boundary as an error: every
//! variant renders as a status code plus a JSON body, the same way the real
//! backend reports failures.

use crate::config::ConfigError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tricklist_core::ports::PortError;

/// The primary error type for the `mirror` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required field was missing or empty.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Account already exists")]
    DuplicateAccount,

    /// Unknown email and wrong password are deliberately indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Nobody is signed in.
    #[error("Unauthorized")]
    Unauthorized,

    /// Signed in, but the route is owner-only.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The body or a path id could not be parsed.
    #[error("{0}")]
    MalformedRequest(String),

    /// The passthrough backend could not be reached.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    ///
    /// Owner-only rejections use 401, not 403: that is what callers written
    /// against the real backend check for.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateAccount => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::Unauthorized | Self::Forbidden(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Port(PortError::Unauthorized) => StatusCode::UNAUTHORIZED,
            Self::Port(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The text safe to hand back to a caller.
    fn public_message(&self) -> String {
        match self {
            Self::Port(PortError::NotFound(what)) => what.clone(),
            Self::Port(PortError::Unauthorized) => "Unauthorized".to_string(),
            Self::Port(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = match self {
            Self::Unauthorized => json!({ "message": "Unauthorized" }),
            other => json!({ "error": other.public_message() }),
        };
        (status, Json(body)).into_response()
    }
}
