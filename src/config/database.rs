use crate::core::{AppError, Result};
use serde::Deserialize;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::env;
use std::time::Duration;

/// Which store backs the transaction ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// MySQL with conditional updates; required in production
    Mysql,
    /// Single-process store for tests and local development
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(StorageBackend::Mysql),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(AppError::Configuration(format!(
                "Invalid STORAGE_BACKEND '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: String,
    pub pool_size: u32,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        let backend: StorageBackend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "mysql".to_string())
            .parse()?;

        // The in-memory store never opens a connection
        let url = match backend {
            StorageBackend::Mysql => env::var("DATABASE_URL")
                .map_err(|_| AppError::Configuration("DATABASE_URL not set".to_string()))?,
            StorageBackend::Memory => env::var("DATABASE_URL").unwrap_or_default(),
        };

        Ok(DatabaseConfig {
            backend,
            url,
            pool_size: env::var("DATABASE_POOL_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| {
                    AppError::Configuration("Invalid DATABASE_POOL_SIZE".to_string())
                })?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| {
                    AppError::Configuration("Invalid DATABASE_MAX_CONNECTIONS".to_string())
                })?,
        })
    }

    /// Create a MySQL connection pool
    pub async fn create_pool(&self) -> Result<MySqlPool> {
        MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.pool_size.min(self.max_connections))
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600)) // 10 minutes
            .max_lifetime(Duration::from_secs(1800)) // 30 minutes
            .test_before_acquire(true)
            .connect(&self.url)
            .await
            .map_err(AppError::Database)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend == StorageBackend::Mysql && self.url.trim().is_empty() {
            return Err(AppError::Configuration(
                "DATABASE_URL must not be empty".to_string(),
            ));
        }

        if self.pool_size == 0 || self.max_connections == 0 {
            return Err(AppError::Configuration(
                "Database pool size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
