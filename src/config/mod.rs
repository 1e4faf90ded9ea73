use crate::core::{AppError, Result};
use serde::Deserialize;
use std::env;

pub mod database;
pub mod momo;
pub mod server;

pub use database::{DatabaseConfig, StorageBackend};
pub use momo::{CallbackUrls, GatewayMode, MomoConfig};
pub use server::ServerConfig;

/// Main application configuration
///
/// Built once at startup and handed to services; nothing below `main`
/// reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub momo: MomoConfig,
    pub auth: AuthConfig,
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(AppError::Configuration(format!("Invalid APP_ENV '{}'", other))),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// `pretty` or `json`
    pub log_format: String,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env == Environment::Production
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .finish()
    }
}

/// What a user-initiated status poll may do with a still-pending transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPolicy {
    /// Report the stored status only
    ReportOnly,
    /// Ask the provider for the authoritative status
    QueryProvider,
    /// Treat the user's return from the provider as success (non-production only)
    TrustReturn,
}

impl std::str::FromStr for PollPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "report_only" => Ok(PollPolicy::ReportOnly),
            "query_provider" => Ok(PollPolicy::QueryProvider),
            "trust_return" => Ok(PollPolicy::TrustReturn),
            other => Err(AppError::Configuration(format!("Invalid POLL_POLICY '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    pub poll_policy: PollPolicy,
    /// Pending longer than this is marked failed
    pub fail_after_minutes: i64,
    /// Pending longer than this is marked cancelled
    pub cancel_after_hours: i64,
}

impl ReconciliationConfig {
    pub fn fail_after(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.fail_after_minutes)
    }

    pub fn cancel_after(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cancel_after_hours)
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            poll_policy: PollPolicy::ReportOnly,
            fail_after_minutes: 10,
            cancel_after_hours: 24,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV")
                    .unwrap_or_else(|_| "development".to_string())
                    .parse()?,
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            },
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            momo: MomoConfig::from_env()?,
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET").unwrap_or_default(),
            },
            reconciliation: ReconciliationConfig {
                poll_policy: env::var("POLL_POLICY")
                    .unwrap_or_else(|_| "report_only".to_string())
                    .parse()?,
                fail_after_minutes: env::var("PENDING_FAIL_AFTER_MINUTES")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::Configuration("Invalid PENDING_FAIL_AFTER_MINUTES".to_string())
                    })?,
                cancel_after_hours: env::var("PENDING_CANCEL_AFTER_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::Configuration("Invalid PENDING_CANCEL_AFTER_HOURS".to_string())
                    })?,
            },
        };

        Ok(config)
    }

    /// Validate configuration
    ///
    /// Every test-only shortcut is refused when `APP_ENV=production`.
    pub fn validate(&self) -> Result<()> {
        let production = self.app.is_production();

        self.database.validate()?;
        self.momo.validate(production)?;

        let timeouts = &self.reconciliation;
        if timeouts.fail_after_minutes <= 0 || timeouts.cancel_after_hours <= 0 {
            return Err(AppError::Configuration(
                "Pending timeouts must be greater than 0".to_string(),
            ));
        }

        if self.reconciliation.fail_after() >= self.reconciliation.cancel_after() {
            return Err(AppError::Configuration(
                "PENDING_FAIL_AFTER_MINUTES must be shorter than PENDING_CANCEL_AFTER_HOURS"
                    .to_string(),
            ));
        }

        if self.auth.jwt_secret.trim().is_empty() {
            return Err(AppError::Configuration("JWT_SECRET not set".to_string()));
        }

        if production {
            if self.database.backend == StorageBackend::Memory {
                return Err(AppError::Configuration(
                    "STORAGE_BACKEND=memory cannot be used in production".to_string(),
                ));
            }

            if self.reconciliation.poll_policy == PollPolicy::TrustReturn {
                return Err(AppError::Configuration(
                    "POLL_POLICY=trust_return cannot be used in production".to_string(),
                ));
            }
        }

        Ok(())
    }
}
