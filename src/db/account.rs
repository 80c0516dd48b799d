/// Account database models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account record in the database
///
/// `gender` and `user_type` hold the wire codes (`"M"`, `"home_seeker"`, ...);
/// `Account::from_record` lifts them into enums.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub gender: String,
    pub user_type: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Refresh token issued to an account
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OutstandingToken {
    pub jti: String,
    pub account_id: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    /// Unix timestamp, same value as the token's `exp` claim
    pub expires_at: i64,
}

