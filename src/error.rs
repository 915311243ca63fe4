//! Service error types with HTTP status code mapping.
//!
//! [`TrackerError`] is the central error type. Each variant maps to a
//! specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid request: time must be HH:MM",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category           | HTTP Status                  |
/// |-----------|--------------------|------------------------------|
/// | 1000–1999 | Validation         | 400 Bad Request              |
/// | 2000–2999 | Not Found/Conflict | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server             | 500 Internal Server Error    |
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Child with the given ID was not found.
    #[error("child not found: {0}")]
    ChildNotFound(uuid::Uuid),

    /// Record or event with the given ID was not found for the child.
    #[error("{kind} entry not found: {id}")]
    EntryNotFound {
        /// Record kind or event log name (e.g. `"sleep"`).
        kind: &'static str,
        /// Entry identifier.
        id: uuid::Uuid,
    },

    /// Another record of the same kind already uses the key.
    #[error("{kind} key already in use: {key}")]
    KeyConflict {
        /// Record kind (e.g. `"food"`).
        kind: &'static str,
        /// The colliding tooth id or food name.
        key: String,
    },

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TrackerError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::ChildNotFound(_) => 2001,
            Self::EntryNotFound { .. } => 2002,
            Self::KeyConflict { .. } => 2003,
            Self::PersistenceError(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ChildNotFound(_) | Self::EntryNotFound { .. } => StatusCode::NOT_FOUND,
            Self::KeyConflict { .. } => StatusCode::CONFLICT,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Shorthand for an [`TrackerError::InvalidRequest`] built from anything
    /// displayable.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}

impl From<sqlx::Error> for TrackerError {
    fn from(e: sqlx::Error) -> Self {
        Self::PersistenceError(e.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
