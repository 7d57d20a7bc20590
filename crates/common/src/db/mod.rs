//! Database layer for the query log
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection pool management
//! - Idempotent schema bootstrap

pub mod models;
mod repository;

pub use repository::Repository;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

const CREATE_QUERY_LOGS: &str = r#"
CREATE TABLE IF NOT EXISTS query_logs (
    id          uuid PRIMARY KEY,
    question    text NOT NULL,
    response    jsonb NOT NULL,
    summary     text NOT NULL,
    created_at  timestamptz NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_query_logs_created_at ON query_logs (created_at DESC);
"#;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    pub primary: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool for the given URL
    pub async fn new(url: &str, config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to query log database...");

        let mut opts = ConnectOptions::new(url);
        opts
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(false);

        let primary = Database::connect(opts)
            .await
            .map_err(|e| AppError::LogStore {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self { primary })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Create the query log table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        self.primary
            .execute_unprepared(CREATE_QUERY_LOGS)
            .await
            .map_err(|e| AppError::LogStore {
                message: format!("Schema bootstrap failed: {}", e),
            })?;
        Ok(())
    }
}
