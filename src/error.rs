/// Unified error types for Haven accounts
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the account service
#[derive(Error, Debug)]
pub enum AccountError {
    /// Bad input shape or value
    #[error("Validation error: {0}")]
    Validation(String),

    /// Login failure. The cause (unknown email, inactive account, wrong
    /// password) is deliberately not distinguished.
    #[error("No active account found with the given credentials")]
    InvalidCredentials,

    /// Expired, malformed or revoked token
    #[error("Token is invalid or expired")]
    TokenInvalid,

    /// Missing credentials on a protected route
    #[error("Authentication required: {0}")]
    Authentication(String),

    /// Authenticated but not permitted
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Target record absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image storage errors
    #[error("Image storage error: {0}")]
    ImageStorage(String),

    /// JWT encoding errors
    #[error("JWT error: {0}")]
    Jwt(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl AccountError {
    /// HTTP status and stable error code for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AccountError::Validation(_) => (StatusCode::BAD_REQUEST, "InvalidRequest"),
            AccountError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "InvalidCredentials"),
            AccountError::TokenInvalid => (StatusCode::UNAUTHORIZED, "TokenInvalid"),
            AccountError::Authentication(_) => {
                (StatusCode::UNAUTHORIZED, "AuthenticationRequired")
            }
            AccountError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            AccountError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            AccountError::Database(_)
            | AccountError::Migration(_)
            | AccountError::Io(_)
            | AccountError::ImageStorage(_)
            | AccountError::Jwt(_)
            | AccountError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError")
            }
        }
    }
}

/// Convert AccountError to HTTP response
impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal failure: {}", self);
            "Internal server error".to_string() // Don't leak details
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for account operations
pub type AccountResult<T> = Result<T, AccountError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AccountError::Validation("x".into()).status().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AccountError::InvalidCredentials.status().0, StatusCode::UNAUTHORIZED);
        assert_eq!(AccountError::TokenInvalid.status().0, StatusCode::UNAUTHORIZED);
        assert_eq!(
            AccountError::Forbidden("x".into()).status().0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AccountError::NotFound("x".into()).status().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AccountError::Internal("x".into()).status().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_credentials_message_does_not_leak_cause() {
        let msg = AccountError::InvalidCredentials.to_string();
        assert!(!msg.contains("password"));
        assert!(!msg.contains("inactive"));
    }
}
