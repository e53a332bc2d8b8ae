//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lotdeck_core::auth::AuthError;
use lotdeck_core::pricing::PricingError;
use lotdeck_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No session token was supplied.
    #[error("authentication required")]
    Unauthorized,

    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token is unknown or has timed out.
    #[error("session expired")]
    SessionExpired,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    /// Rejected schedule edit.
    #[error("invalid pricing change: {0}")]
    Pricing(#[from] PricingError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            ApiError::SessionExpired => (StatusCode::UNAUTHORIZED, "session_expired"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::Pricing(_) => (StatusCode::BAD_REQUEST, "invalid_pricing"),
            ApiError::Storage(StorageError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Storage(StorageError::Conflict(_)) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            ApiError::Auth(AuthError::PasswordEmpty | AuthError::PasswordTooShort) => {
                (StatusCode::BAD_REQUEST, "invalid_password")
            }
            ApiError::Auth(_) => (StatusCode::INTERNAL_SERVER_ERROR, "auth_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
