/// Application context and dependency injection
use crate::{
    account::AccountManager,
    config::ServerConfig,
    db,
    error::{AccountError, AccountResult},
    image_store::ImageStore,
    service::AccountService,
    session::SessionManager,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub account_db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub session_manager: Arc<SessionManager>,
    pub account_service: Arc<AccountService>,
    pub image_store: ImageStore,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AccountResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let account_db =
            db::create_pool(&config.storage.account_db, db::DatabaseOptions::default()).await?;
        db::run_migrations(&account_db).await?;
        db::test_connection(&account_db).await?;

        Ok(Self::assemble(config, account_db))
    }

    /// Context over a fresh in-memory database
    pub async fn in_memory(config: ServerConfig) -> AccountResult<Self> {
        config.validate()?;

        let account_db = db::create_memory_pool().await?;
        Ok(Self::assemble(config, account_db))
    }

    fn assemble(config: ServerConfig, account_db: SqlitePool) -> Self {
        let account_manager = Arc::new(AccountManager::new(account_db.clone()));

        let session_manager = Arc::new(SessionManager::new(
            account_db.clone(),
            Arc::clone(&account_manager),
            config.authentication.clone(),
        ));

        let image_store = ImageStore::new(
            config.storage.image_directory.clone(),
            config.service.image_upload_limit,
        );

        let account_service = Arc::new(AccountService::new(
            Arc::clone(&account_manager),
            image_store.clone(),
        ));

        Self {
            config: Arc::new(config),
            account_db,
            account_manager,
            session_manager,
            account_service,
            image_store,
        }
    }

    /// Ensure all required directories exist
    async fn ensure_directories(config: &ServerConfig) -> AccountResult<()> {
        for dir in [
            &config.storage.data_directory,
            &config.storage.image_directory,
        ] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                AccountError::Internal(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        if let Some(parent) = config.storage.account_db.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        Ok(())
    }
}
