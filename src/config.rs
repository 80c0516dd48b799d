/// Configuration management for Haven accounts
use crate::account::Gender;
use crate::error::{AccountError, AccountResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Upper bound for token lifetimes (one year)
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub bootstrap: Option<SuperuserBootstrap>,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
    /// Maximum accepted profile image size in bytes
    pub image_upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub account_db: PathBuf,
    pub image_directory: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

/// Superuser created at startup if no account with this email exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperuserBootstrap {
    pub email: String,
    pub password: String,
    pub name: String,
    pub gender: Gender,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AccountResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("HAVEN_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("HAVEN_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| AccountError::Validation("Invalid port number".to_string()))?;
        let version = env::var("HAVEN_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());
        let image_upload_limit = env::var("HAVEN_IMAGE_UPLOAD_LIMIT")
            .unwrap_or_else(|_| "5242880".to_string())
            .parse()
            .unwrap_or(5242880);

        let data_directory: PathBuf = env::var("HAVEN_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let account_db = env::var("HAVEN_ACCOUNT_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("account.sqlite"));
        let image_directory = env::var("HAVEN_IMAGE_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("media"));

        let jwt_secret = env::var("HAVEN_JWT_SECRET")
            .map_err(|_| AccountError::Validation("JWT secret required".to_string()))?;
        // 5 minutes / 1 day
        let access_token_ttl_secs = env::var("HAVEN_ACCESS_TOKEN_TTL")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);
        let refresh_token_ttl_secs = env::var("HAVEN_REFRESH_TOKEN_TTL")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86400);

        let bootstrap = match (
            env::var("HAVEN_SUPERUSER_EMAIL"),
            env::var("HAVEN_SUPERUSER_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(SuperuserBootstrap {
                email,
                password,
                name: env::var("HAVEN_SUPERUSER_NAME").unwrap_or_default(),
                gender: env::var("HAVEN_SUPERUSER_GENDER")
                    .ok()
                    .map(|g| Gender::parse(&g))
                    .transpose()?
                    .unwrap_or(Gender::Male),
            }),
            _ => None,
        };

        let log_level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "haven_accounts=debug,tower_http=debug".to_string());
        let log_json = env::var("HAVEN_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
                image_upload_limit,
            },
            storage: StorageConfig {
                data_directory,
                account_db,
                image_directory,
            },
            authentication: AuthConfig {
                jwt_secret,
                access_token_ttl_secs,
                refresh_token_ttl_secs,
            },
            bootstrap,
            logging: LoggingConfig {
                level: log_level,
                json: log_json,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AccountResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AccountError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(AccountError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.access_token_ttl_secs <= 0
            || self.authentication.refresh_token_ttl_secs <= 0
        {
            return Err(AccountError::Validation(
                "Token lifetimes must be positive".to_string(),
            ));
        }

        if self.authentication.access_token_ttl_secs > MAX_TOKEN_TTL_SECS
            || self.authentication.refresh_token_ttl_secs > MAX_TOKEN_TTL_SECS
        {
            return Err(AccountError::Validation(format!(
                "Token lifetimes cannot exceed {} seconds",
                MAX_TOKEN_TTL_SECS
            )));
        }

        Ok(())
    }

    /// Configuration suitable for tests: in-memory paths and a fixed secret
    pub fn for_tests(image_directory: PathBuf) -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8000,
                version: "0.1.0".to_string(),
                image_upload_limit: 1024 * 1024,
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                account_db: PathBuf::from(":memory:"),
                image_directory,
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-key-for-testing-only-0123456789".to_string(),
                access_token_ttl_secs: 300,
                refresh_token_ttl_secs: 86400,
            },
            bootstrap: None,
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = ServerConfig::for_tests(PathBuf::from("./media"));
        assert!(config.validate().is_ok());

        config.authentication.jwt_secret = "short".to_string();
        assert!(matches!(config.validate(), Err(AccountError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_non_positive_ttl() {
        let mut config = ServerConfig::for_tests(PathBuf::from("./media"));
        config.authentication.access_token_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_excessive_ttl() {
        let mut config = ServerConfig::for_tests(PathBuf::from("./media"));
        config.authentication.refresh_token_ttl_secs = MAX_TOKEN_TTL_SECS;
        assert!(config.validate().is_ok());

        config.authentication.refresh_token_ttl_secs = i64::MAX;
        assert!(matches!(config.validate(), Err(AccountError::Validation(_))));
    }
}
