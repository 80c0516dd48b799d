/// Session management
///
/// JWT access/refresh token issuance, refresh, and logout backed by the
/// outstanding/blacklisted token ledger.

mod manager;

pub use manager::SessionManager;

use serde::{Deserialize, Serialize};

/// Which of the pair a token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims shared by access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    /// Unique token id, the ledger key for refresh tokens
    pub jti: String,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

/// Freshly minted token pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}
