/// Credential store backed by the account table
/// Uses sqlx runtime queries so no DATABASE_URL is needed at compile time

use crate::{
    account::{Account, Gender, Role},
    db::{self, account::AccountRecord},
    error::{AccountError, AccountResult},
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, name, gender, user_type, is_active,
                               is_staff, is_superuser, image, created_at";

/// Fields of an account about to be inserted
///
/// The email must already be normalized and the password already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub gender: Gender,
    pub role: Role,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a new account
    ///
    /// The UNIQUE constraint on `email` is the authority: a concurrent insert
    /// of the same email loses with a validation error.
    pub async fn create_account(&self, new: NewAccount) -> AccountResult<Account> {
        if self.email_exists(&new.email).await? {
            return Err(duplicate_email());
        }

        self.insert_account(new).await
    }

    /// Insert without the existence pre-check; a racing duplicate is caught
    /// by the constraint
    async fn insert_account(&self, new: NewAccount) -> AccountResult<Account> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO account (id, email, password_hash, name, gender, user_type,
                                  is_active, is_staff, is_superuser, image, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, ?10)",
        )
        .bind(&id)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.name)
        .bind(new.gender.as_str())
        .bind(new.role.as_str())
        .bind(new.is_active)
        .bind(new.is_staff)
        .bind(new.is_superuser)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                duplicate_email()
            } else {
                AccountError::Database(e)
            }
        })?;

        tracing::info!(account_id = %id, role = new.role.as_str(), "Account created");

        Ok(Account {
            id,
            email: new.email,
            password_hash: new.password_hash,
            name: new.name,
            gender: new.gender,
            role: new.role,
            is_active: new.is_active,
            is_staff: new.is_staff,
            is_superuser: new.is_superuser,
            image: None,
            created_at: now,
        })
    }

    /// Get account by id
    pub async fn get_account(&self, id: &str) -> AccountResult<Account> {
        self.find_account(id)
            .await?
            .ok_or_else(|| AccountError::NotFound("Account not found".to_string()))
    }

    /// Get account by id, `None` if absent
    pub async fn find_account(&self, id: &str) -> AccountResult<Option<Account>> {
        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "SELECT {} FROM account WHERE id = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        record.map(Account::from_record).transpose()
    }

    /// Get account by normalized email, `None` if absent
    pub async fn find_by_email(&self, email: &str) -> AccountResult<Option<Account>> {
        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "SELECT {} FROM account WHERE email = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        record.map(Account::from_record).transpose()
    }

    /// Check if email exists
    pub async fn email_exists(&self, email: &str) -> AccountResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }

    /// Update name and/or password hash in one transaction
    pub async fn update_profile(
        &self,
        id: &str,
        name: Option<&str>,
        password_hash: Option<&str>,
    ) -> AccountResult<Account> {
        let mut tx = self.db.begin().await?;

        if let Some(name) = name {
            let result = sqlx::query("UPDATE account SET name = ?1 WHERE id = ?2")
                .bind(name)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(AccountError::NotFound("Account not found".to_string()));
            }
        }

        if let Some(password_hash) = password_hash {
            let result = sqlx::query("UPDATE account SET password_hash = ?1 WHERE id = ?2")
                .bind(password_hash)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(AccountError::NotFound("Account not found".to_string()));
            }
        }

        tx.commit().await?;

        self.get_account(id).await
    }

    /// Replace the image reference, returning the updated account and the
    /// reference it replaced
    pub async fn set_image(
        &self,
        id: &str,
        image: Option<&str>,
    ) -> AccountResult<(Account, Option<String>)> {
        let mut tx = self.db.begin().await?;

        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT image FROM account WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let previous =
            previous.ok_or_else(|| AccountError::NotFound("Account not found".to_string()))?;

        sqlx::query("UPDATE account SET image = ?1 WHERE id = ?2")
            .bind(image)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let account = self.get_account(id).await?;
        Ok((account, previous))
    }

    /// Set the active flag (soft deactivation)
    pub async fn set_active(&self, id: &str, is_active: bool) -> AccountResult<()> {
        let result = sqlx::query("UPDATE account SET is_active = ?1 WHERE id = ?2")
            .bind(is_active)
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound("Account not found".to_string()));
        }

        Ok(())
    }

    /// List accounts in creation order, optionally excluding Admin accounts
    pub async fn list_accounts(&self, include_admins: bool) -> AccountResult<Vec<Account>> {
        let query = if include_admins {
            format!(
                "SELECT {} FROM account ORDER BY created_at, id",
                ACCOUNT_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM account WHERE user_type != 'admin' ORDER BY created_at, id",
                ACCOUNT_COLUMNS
            )
        };

        let records = sqlx::query_as::<_, AccountRecord>(&query)
            .fetch_all(&self.db)
            .await?;

        records.into_iter().map(Account::from_record).collect()
    }
}

fn duplicate_email() -> AccountError {
    AccountError::Validation("user with this email already exists.".to_string())
}
