//! Standardized API error responses.
//!
//! Every failure is returned with `Content-Type: application/json` and the
//! body:
//!
//! ```json
//! { "error": "Human-readable message" }
//! ```
//!
//! The HTTP status is chosen from an [`ErrorCode`], which is kept out of the
//! body so the envelope stays a single `error` string.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::errors::DeskError;
use crate::server::validation::ValidationError;

/// Error classification used to pick the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // === Validation Errors (400) ===
    /// Request body is not valid JSON or has the wrong shape
    InvalidRequest,
    /// A required field is missing or empty
    MissingField,
    /// The requested approval status is not accepted
    InvalidStatus,

    // === Resource Errors (404/405) ===
    /// Referenced license request or license does not exist
    NotFound,
    /// HTTP method not supported on this endpoint
    MethodNotAllowed,

    // === Server Errors (5xx) ===
    /// Stored license validity cannot be applied
    InvalidLicenseData,
    /// Database operation failed
    DatabaseError,
    /// Server configuration error
    ConfigError,
    /// Unexpected internal server error
    InternalError,
}

impl ErrorCode {
    /// Returns the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest | ErrorCode::MissingField | ErrorCode::InvalidStatus => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::InvalidLicenseData
            | ErrorCode::DatabaseError
            | ErrorCode::ConfigError
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a default human-readable message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "Request payload is invalid",
            ErrorCode::MissingField => "A required field is missing",
            ErrorCode::InvalidStatus => "Status value is not accepted",
            ErrorCode::NotFound => "The requested resource was not found",
            ErrorCode::MethodNotAllowed => "Method not allowed",
            ErrorCode::InvalidLicenseData => "License validity is invalid",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::ConfigError => "Server configuration error",
            ErrorCode::InternalError => "An unexpected error occurred",
        }
    }
}

/// Standardized API error response.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub code: ErrorCode,
    /// Human-readable error message
    pub error: String,
}

impl ApiError {
    /// Creates a new API error with the default message for `code`.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            error: code.default_message().to_string(),
        }
    }

    /// Creates a new API error with a custom message.
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            error: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn method_not_allowed() -> Self {
        Self::new(ErrorCode::MethodNotAllowed)
    }

    /// Database error (internal details hidden from client).
    pub fn database_error() -> Self {
        Self::new(ErrorCode::DatabaseError)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.default_message(), self.error)
    }
}

impl std::error::Error for ApiError {}

// === Conversions from existing error types ===

impl From<DeskError> for ApiError {
    fn from(err: DeskError) -> Self {
        match err {
            DeskError::InvalidInput(msg) => ApiError::with_message(ErrorCode::MissingField, msg),
            e @ DeskError::InvalidStatus(_) => {
                ApiError::with_message(ErrorCode::InvalidStatus, e.to_string())
            }
            DeskError::NotFound(msg) => ApiError::with_message(ErrorCode::NotFound, msg),
            e @ (DeskError::InvalidValidityUnit(_) | DeskError::InvalidValidityPeriod(_)) => {
                error!("Rejecting approval: {e}");
                ApiError::with_message(ErrorCode::InvalidLicenseData, e.to_string())
            }
            DeskError::StorageError(msg) => {
                error!("Storage failure surfaced to client: {msg}");
                ApiError::database_error()
            }
            DeskError::ConfigError(msg) => ApiError::with_message(ErrorCode::ConfigError, msg),
            DeskError::ServerError(msg) => ApiError::with_message(ErrorCode::InternalError, msg),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        DeskError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Rejected request body: {}", rejection.body_text());
        ApiError::with_message(ErrorCode::InvalidRequest, rejection.body_text())
    }
}
