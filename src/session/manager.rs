/// Session manager implementation
///
/// Refresh tokens move through `issued -> active -> revoked`. Refreshing
/// mints a new access token and leaves the refresh token active; logout
/// blacklists every outstanding refresh token of the owning account.
use crate::{
    account::{normalize_email, password::verify_password, Account, AccountManager},
    config::AuthConfig,
    db::account::OutstandingToken,
    error::{AccountError, AccountResult},
    session::{Claims, TokenPair, TokenType},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Session manager service
pub struct SessionManager {
    db: SqlitePool,
    accounts: Arc<AccountManager>,
    config: AuthConfig,
}

impl SessionManager {
    pub fn new(db: SqlitePool, accounts: Arc<AccountManager>, config: AuthConfig) -> Self {
        Self {
            db,
            accounts,
            config,
        }
    }

    /// Authenticate by email and password and mint a token pair
    ///
    /// Unknown email, inactive account and wrong password all yield the same
    /// `InvalidCredentials` error.
    pub async fn login(&self, email: &str, password: &str) -> AccountResult<TokenPair> {
        let email = normalize_email(email);

        let Some(account) = self.accounts.find_by_email(&email).await? else {
            tracing::debug!("login: unknown email");
            return Err(AccountError::InvalidCredentials);
        };

        if !account.is_active {
            tracing::debug!(account_id = %account.id, "login: inactive account");
            return Err(AccountError::InvalidCredentials);
        }

        if !verify_password(password, &account.password_hash)? {
            tracing::debug!(account_id = %account.id, "login: password mismatch");
            return Err(AccountError::InvalidCredentials);
        }

        let pair = self.issue_pair(&account.id).await?;

        tracing::info!(account_id = %account.id, "Session created");

        Ok(pair)
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> AccountResult<String> {
        let claims = self.decode_token(refresh_token, TokenType::Refresh)?;

        {
            let mut conn = self.db.acquire().await?;
            ensure_refreshable(&mut conn, &claims, refresh_token).await?;
        }

        let (access, _) = self.encode_token(
            &claims.sub,
            TokenType::Access,
            self.config.access_token_ttl_secs,
        )?;

        Ok(access)
    }

    /// Revoke the presented refresh token and every other outstanding
    /// refresh token of the same account
    pub async fn logout(&self, refresh_token: &str) -> AccountResult<()> {
        let claims = self.decode_token(refresh_token, TokenType::Refresh)?;
        self.revoke_all(&claims, refresh_token).await
    }

    /// Logout on behalf of an authenticated account
    ///
    /// A refresh token owned by any other account is rejected as invalid
    /// and nothing is revoked.
    pub async fn logout_as(&self, account_id: &str, refresh_token: &str) -> AccountResult<()> {
        let claims = self.decode_token(refresh_token, TokenType::Refresh)?;

        if claims.sub != account_id {
            tracing::warn!(caller = %account_id, owner = %claims.sub, "Logout with foreign refresh token");
            return Err(AccountError::TokenInvalid);
        }

        self.revoke_all(&claims, refresh_token).await
    }

    async fn revoke_all(&self, claims: &Claims, refresh_token: &str) -> AccountResult<()> {
        let mut tx = self.db.begin().await?;

        ensure_refreshable(&mut tx, claims, refresh_token).await?;

        let revoked = sqlx::query(
            "INSERT OR IGNORE INTO blacklisted_token (jti, blacklisted_at)
             SELECT jti, ?1 FROM outstanding_token WHERE account_id = ?2",
        )
        .bind(Utc::now())
        .bind(&claims.sub)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::info!(account_id = %claims.sub, revoked, "Logged out of all sessions");

        Ok(())
    }

    /// Resolve an access token to its account
    ///
    /// Access tokens are not individually revocable, so the blacklist is not
    /// consulted.
    pub async fn validate_access_token(&self, access_token: &str) -> AccountResult<Account> {
        let claims = self.decode_token(access_token, TokenType::Access)?;

        match self.accounts.find_account(&claims.sub).await? {
            Some(account) if account.is_active => Ok(account),
            _ => {
                tracing::warn!(account_id = %claims.sub, "Access token for missing or inactive account");
                Err(AccountError::TokenInvalid)
            }
        }
    }

    /// Refresh tokens of an account that are neither blacklisted nor expired
    pub async fn active_refresh_tokens(&self, account_id: &str) -> AccountResult<Vec<OutstandingToken>> {
        let tokens = sqlx::query_as::<_, OutstandingToken>(
            "SELECT o.jti, o.account_id, o.token, o.created_at, o.expires_at
             FROM outstanding_token o
             LEFT JOIN blacklisted_token b ON b.jti = o.jti
             WHERE o.account_id = ?1 AND b.jti IS NULL AND o.expires_at > ?2
             ORDER BY o.created_at",
        )
        .bind(account_id)
        .bind(Utc::now().timestamp())
        .fetch_all(&self.db)
        .await?;

        Ok(tokens)
    }

    /// Delete ledger rows for tokens past their own expiry
    ///
    /// Returns (outstanding_deleted, blacklisted_deleted)
    pub async fn flush_expired_tokens(&self) -> AccountResult<(u64, u64)> {
        let now = Utc::now().timestamp();
        let mut tx = self.db.begin().await?;

        let blacklisted_deleted = sqlx::query(
            "DELETE FROM blacklisted_token
             WHERE jti IN (SELECT jti FROM outstanding_token WHERE expires_at <= ?1)",
        )
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let outstanding_deleted = sqlx::query("DELETE FROM outstanding_token WHERE expires_at <= ?1")
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if outstanding_deleted > 0 {
            tracing::info!(outstanding_deleted, blacklisted_deleted, "Flushed expired tokens");
        } else {
            tracing::debug!("Token flush: no expired tokens found");
        }

        Ok((outstanding_deleted, blacklisted_deleted))
    }

    async fn issue_pair(&self, account_id: &str) -> AccountResult<TokenPair> {
        let (access, _) = self.encode_token(
            account_id,
            TokenType::Access,
            self.config.access_token_ttl_secs,
        )?;
        let (refresh, claims) = self.encode_token(
            account_id,
            TokenType::Refresh,
            self.config.refresh_token_ttl_secs,
        )?;

        sqlx::query(
            "INSERT INTO outstanding_token (jti, account_id, token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&claims.jti)
        .bind(account_id)
        .bind(&refresh)
        .bind(Utc::now())
        .bind(claims.exp)
        .execute(&self.db)
        .await?;

        Ok(TokenPair { access, refresh })
    }

    fn encode_token(
        &self,
        account_id: &str,
        token_type: TokenType,
        ttl_secs: i64,
    ) -> AccountResult<(String, Claims)> {
        let now = Utc::now().timestamp();
        let exp = now
            .checked_add(ttl_secs)
            .ok_or_else(|| AccountError::Internal(format!("Token lifetime {}s overflows", ttl_secs)))?;
        let claims = Claims {
            sub: account_id.to_string(),
            jti: Uuid::new_v4().simple().to_string(),
            token_type,
            iat: now,
            exp,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AccountError::Jwt(format!("Failed to generate token: {}", e)))?;

        Ok((token, claims))
    }

    fn decode_token(&self, token: &str, expected: TokenType) -> AccountResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            tracing::warn!("JWT verification failed: {}", e);
            AccountError::TokenInvalid
        })?;

        if data.claims.token_type != expected {
            tracing::warn!(
                "Token has wrong type: expected {:?}, got {:?}",
                expected,
                data.claims.token_type
            );
            return Err(AccountError::TokenInvalid);
        }

        Ok(data.claims)
    }
}

/// Reject refresh tokens that were never recorded, belong to a different
/// account than their `sub` claim says, are blacklisted, or whose account is
/// inactive
async fn ensure_refreshable(
    conn: &mut SqliteConnection,
    claims: &Claims,
    token: &str,
) -> AccountResult<()> {
    let row = sqlx::query(
        "SELECT o.account_id, a.is_active,
                CASE WHEN b.jti IS NULL THEN 0 ELSE 1 END AS revoked
         FROM outstanding_token o
         JOIN account a ON a.id = o.account_id
         LEFT JOIN blacklisted_token b ON b.jti = o.jti
         WHERE o.jti = ?1 AND o.token = ?2",
    )
    .bind(&claims.jti)
    .bind(token)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        tracing::warn!(jti = %claims.jti, "Refresh token not in ledger");
        return Err(AccountError::TokenInvalid);
    };

    let account_id: String = row.try_get("account_id")?;
    let is_active: bool = row.try_get("is_active")?;
    let revoked: i64 = row.try_get("revoked")?;

    if account_id != claims.sub {
        tracing::warn!(jti = %claims.jti, "Refresh token owner mismatch");
        return Err(AccountError::TokenInvalid);
    }

    if revoked != 0 {
        tracing::warn!(jti = %claims.jti, "Refresh token is blacklisted");
        return Err(AccountError::TokenInvalid);
    }

    if !is_active {
        tracing::warn!(account_id = %account_id, "Refresh token for inactive account");
        return Err(AccountError::TokenInvalid);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        account::{password::hash_password, Gender, NewAccount, Role},
        config::ServerConfig,
        db,
    };
    use std::path::PathBuf;

    struct Fixture {
        accounts: Arc<AccountManager>,
        sessions: SessionManager,
    }

    async fn create_test_sessions() -> Fixture {
        let pool = db::create_memory_pool().await.unwrap();
        let accounts = Arc::new(AccountManager::new(pool.clone()));
        let config = ServerConfig::for_tests(PathBuf::from("./media"));
        let sessions = SessionManager::new(pool, Arc::clone(&accounts), config.authentication);
        Fixture { accounts, sessions }
    }

    async fn create_user(accounts: &AccountManager, email: &str, password: &str) -> Account {
        accounts
            .create_account(NewAccount {
                email: email.to_string(),
                password_hash: hash_password(password).unwrap(),
                name: "Test Name".to_string(),
                gender: Gender::Male,
                role: Role::HomeSeeker,
                is_active: true,
                is_staff: false,
                is_superuser: false,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_issues_pair_and_records_refresh() {
        let f = create_test_sessions().await;
        let account = create_user(&f.accounts, "test@example.com", "test-user-password123").await;

        let pair = f
            .sessions
            .login("test@example.com", "test-user-password123")
            .await
            .unwrap();

        assert!(!pair.access.is_empty());
        assert_ne!(pair.access, pair.refresh);

        let validated = f.sessions.validate_access_token(&pair.access).await.unwrap();
        assert_eq!(validated.id, account.id);

        let outstanding = f.sessions.active_refresh_tokens(&account.id).await.unwrap();
        assert_eq!(outstanding.len(), 1);
        assert_eq!(outstanding[0].token, pair.refresh);
    }

    #[tokio::test]
    async fn test_login_normalizes_email_domain() {
        let f = create_test_sessions().await;
        create_user(&f.accounts, "Case@example.com", "pw1234").await;

        assert!(f.sessions.login("Case@EXAMPLE.COM", "pw1234").await.is_ok());
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let f = create_test_sessions().await;
        let account = create_user(&f.accounts, "test@example.com", "pw1234").await;

        let wrong_password = f.sessions.login("test@example.com", "nope").await;
        let unknown_email = f.sessions.login("nobody@example.com", "pw1234").await;

        f.accounts.set_active(&account.id, false).await.unwrap();
        let inactive = f.sessions.login("test@example.com", "pw1234").await;

        for result in [wrong_password, unknown_email, inactive] {
            assert!(matches!(result, Err(AccountError::InvalidCredentials)));
        }

        // no token issued on failure
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM outstanding_token")
            .fetch_one(&f.sessions.db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_refresh_yields_valid_access_token() {
        let f = create_test_sessions().await;
        let account = create_user(&f.accounts, "test@example.com", "pw1234").await;
        let pair = f.sessions.login("test@example.com", "pw1234").await.unwrap();

        let access = f.sessions.refresh(&pair.refresh).await.unwrap();
        let validated = f.sessions.validate_access_token(&access).await.unwrap();
        assert_eq!(validated.id, account.id);

        // refresh token stays usable
        assert!(f.sessions.refresh(&pair.refresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_wrong_type_and_garbage() {
        let f = create_test_sessions().await;
        create_user(&f.accounts, "test@example.com", "pw1234").await;
        let pair = f.sessions.login("test@example.com", "pw1234").await.unwrap();

        assert!(matches!(
            f.sessions.refresh(&pair.access).await,
            Err(AccountError::TokenInvalid)
        ));
        assert!(matches!(
            f.sessions.refresh("not.a.jwt").await,
            Err(AccountError::TokenInvalid)
        ));
        assert!(matches!(
            f.sessions.validate_access_token(&pair.refresh).await,
            Err(AccountError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_overflowing_lifetime_fails_without_recording() {
        let pool = db::create_memory_pool().await.unwrap();
        let accounts = Arc::new(AccountManager::new(pool.clone()));
        let mut config = ServerConfig::for_tests(PathBuf::from("./media")).authentication;
        config.refresh_token_ttl_secs = i64::MAX;
        let sessions = SessionManager::new(pool, Arc::clone(&accounts), config);

        let account = create_user(&accounts, "test@example.com", "pw1234").await;

        assert!(matches!(
            sessions.login("test@example.com", "pw1234").await,
            Err(AccountError::Internal(_))
        ));
        assert!(sessions
            .active_refresh_tokens(&account.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_expired_tokens_are_rejected() {
        let f = create_test_sessions().await;
        let account = create_user(&f.accounts, "test@example.com", "pw1234").await;

        let (expired_access, _) = f
            .sessions
            .encode_token(&account.id, TokenType::Access, -10)
            .unwrap();
        assert!(matches!(
            f.sessions.validate_access_token(&expired_access).await,
            Err(AccountError::TokenInvalid)
        ));

        let (expired_refresh, _) = f
            .sessions
            .encode_token(&account.id, TokenType::Refresh, -10)
            .unwrap();
        assert!(matches!(
            f.sessions.refresh(&expired_refresh).await,
            Err(AccountError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_unrecorded_refresh_token_is_rejected() {
        let f = create_test_sessions().await;
        let account = create_user(&f.accounts, "test@example.com", "pw1234").await;

        let (forged, _) = f
            .sessions
            .encode_token(&account.id, TokenType::Refresh, 3600)
            .unwrap();
        assert!(matches!(
            f.sessions.refresh(&forged).await,
            Err(AccountError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let f = create_test_sessions().await;
        let account = create_user(&f.accounts, "test@example.com", "pw1234").await;

        let mut other_config = ServerConfig::for_tests(PathBuf::from("./media")).authentication;
        other_config.jwt_secret = "a-completely-different-secret-key-0123456789".to_string();
        let other = SessionManager::new(f.sessions.db.clone(), Arc::clone(&f.accounts), other_config);

        let (access, _) = other
            .encode_token(&account.id, TokenType::Access, 300)
            .unwrap();
        assert!(matches!(
            f.sessions.validate_access_token(&access).await,
            Err(AccountError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_logout_revokes_every_outstanding_token() {
        let f = create_test_sessions().await;
        let account = create_user(&f.accounts, "test@example.com", "pw1234").await;
        let other = create_user(&f.accounts, "other@example.com", "pw1234").await;

        let first = f.sessions.login("test@example.com", "pw1234").await.unwrap();
        let second = f.sessions.login("test@example.com", "pw1234").await.unwrap();
        let others = f.sessions.login("other@example.com", "pw1234").await.unwrap();

        f.sessions.logout(&first.refresh).await.unwrap();

        for token in [&first.refresh, &second.refresh] {
            assert!(matches!(
                f.sessions.refresh(token).await,
                Err(AccountError::TokenInvalid)
            ));
        }
        assert!(f
            .sessions
            .active_refresh_tokens(&account.id)
            .await
            .unwrap()
            .is_empty());

        // other accounts are untouched
        assert!(f.sessions.refresh(&others.refresh).await.is_ok());
        assert_eq!(f.sessions.active_refresh_tokens(&other.id).await.unwrap().len(), 1);

        // revoked is terminal
        assert!(matches!(
            f.sessions.logout(&second.refresh).await,
            Err(AccountError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_logout_as_rejects_foreign_token() {
        let f = create_test_sessions().await;
        let account = create_user(&f.accounts, "test@example.com", "pw1234").await;
        let other = create_user(&f.accounts, "other@example.com", "pw1234").await;

        let pair = f.sessions.login("test@example.com", "pw1234").await.unwrap();

        assert!(matches!(
            f.sessions.logout_as(&other.id, &pair.refresh).await,
            Err(AccountError::TokenInvalid)
        ));
        assert!(f.sessions.refresh(&pair.refresh).await.is_ok());

        f.sessions.logout_as(&account.id, &pair.refresh).await.unwrap();
        assert!(f.sessions.refresh(&pair.refresh).await.is_err());
    }

    #[tokio::test]
    async fn test_access_token_survives_logout() {
        let f = create_test_sessions().await;
        create_user(&f.accounts, "test@example.com", "pw1234").await;
        let pair = f.sessions.login("test@example.com", "pw1234").await.unwrap();

        f.sessions.logout(&pair.refresh).await.unwrap();

        assert!(f.sessions.validate_access_token(&pair.access).await.is_ok());
    }

    #[tokio::test]
    async fn test_deactivated_account_tokens_rejected() {
        let f = create_test_sessions().await;
        let account = create_user(&f.accounts, "test@example.com", "pw1234").await;
        let pair = f.sessions.login("test@example.com", "pw1234").await.unwrap();

        f.accounts.set_active(&account.id, false).await.unwrap();

        assert!(matches!(
            f.sessions.validate_access_token(&pair.access).await,
            Err(AccountError::TokenInvalid)
        ));
        assert!(matches!(
            f.sessions.refresh(&pair.refresh).await,
            Err(AccountError::TokenInvalid)
        ));
        assert!(matches!(
            f.sessions.logout(&pair.refresh).await,
            Err(AccountError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_flush_expired_tokens() {
        let f = create_test_sessions().await;
        let account = create_user(&f.accounts, "test@example.com", "pw1234").await;
        let now = Utc::now();

        let live = f.sessions.login("test@example.com", "pw1234").await.unwrap();

        sqlx::query(
            "INSERT INTO outstanding_token (jti, account_id, token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind("expired-jti")
        .bind(&account.id)
        .bind("expired-token")
        .bind(now)
        .bind(now.timestamp() - 60)
        .execute(&f.sessions.db)
        .await
        .unwrap();
        sqlx::query("INSERT INTO blacklisted_token (jti, blacklisted_at) VALUES (?1, ?2)")
            .bind("expired-jti")
            .bind(now)
            .execute(&f.sessions.db)
            .await
            .unwrap();

        let (outstanding_deleted, blacklisted_deleted) =
            f.sessions.flush_expired_tokens().await.unwrap();
        assert_eq!(outstanding_deleted, 1);
        assert_eq!(blacklisted_deleted, 1);

        assert!(f.sessions.refresh(&live.refresh).await.is_ok());

        let (outstanding_deleted, _) = f.sessions.flush_expired_tokens().await.unwrap();
        assert_eq!(outstanding_deleted, 0);
    }
}
