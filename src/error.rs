//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Services return this type; handlers propagate it with `?` and Axum turns
/// it into a JSON error response.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Input Errors**: Bad request shape or range (`Validation`)
/// - **Resource Errors**: Requested user, wallet or transaction does not exist
/// - **Business Logic Errors**: Insufficient funds, duplicate registration
/// - **Security Errors**: Missing credentials, role checks, bad tokens
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    Validation(String),

    /// A user, wallet or transaction could not be found.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Wallet balance is lower than the requested debit.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Insufficient funds")]
    InsufficientFunds,

    /// Caller is authenticated but not allowed to perform the action.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("{0}")]
    Permission(String),

    /// Verification or password-reset token is invalid, expired or already used.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    Token(String),

    /// Resource already exists (e.g., duplicate email at registration).
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    Conflict(String),

    /// Credentials are missing or wrong.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("{0}")]
    Unauthorized(String),

    /// Unexpected failure outside the database (hashing, signing, task join).
    ///
    /// Returns HTTP 500; the message is logged, never sent to the client.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission(message.into())
    }

    pub fn token(message: impl Into<String>) -> Self {
        Self::Token(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `Validation` → 400 Bad Request
/// - `Token` → 400 Bad Request
/// - `Unauthorized` → 401 Unauthorized
/// - `Permission` → 403 Forbidden
/// - `NotFound` → 404 Not Found
/// - `Conflict` → 409 Conflict
/// - `InsufficientFunds` → 422 Unprocessable Entity
/// - `Database` / `Internal` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Validation(ref msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            AppError::Token(ref msg) => (StatusCode::BAD_REQUEST, "invalid_token", msg.clone()),
            AppError::Unauthorized(ref msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            AppError::Permission(ref msg) => {
                (StatusCode::FORBIDDEN, "permission_denied", msg.clone())
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::InsufficientFunds => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_funds",
                self.to_string(),
            ),
            AppError::Database(ref err) => {
                tracing::error!("database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(ref msg) => {
                tracing::error!("internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
