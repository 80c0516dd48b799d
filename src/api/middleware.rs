/// Request helpers shared by the handlers
use crate::error::AccountError;
use axum::{
    body::Bytes,
    extract::rejection::{BytesRejection, JsonRejection},
    http::{HeaderMap, StatusCode},
    Json,
};

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Turn a JSON body rejection into a validation error
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AccountError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        AccountError::Validation(rejection.body_text())
    })
}

/// Turn a raw upload body rejection into a validation error
///
/// Bodies over the router limit are reported with the same message the image
/// store uses for oversized images.
pub fn bytes_body(
    body: Result<Bytes, BytesRejection>,
    limit: usize,
) -> Result<Vec<u8>, AccountError> {
    match body {
        Ok(bytes) => Ok(bytes.to_vec()),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            tracing::debug!(limit, "Rejected oversized upload");
            Err(AccountError::Validation(format!(
                "Image exceeds maximum size of {} bytes",
                limit
            )))
        }
        Err(rejection) => {
            tracing::debug!("Rejected upload body: {}", rejection.body_text());
            Err(AccountError::Validation(rejection.body_text()))
        }
    }
}
