//! SQLite connection pool management

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use super::migrations;
use crate::config::Config;
use crate::error::Result;

const MEMORY: &str = ":memory:";

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite file, or `:memory:`
    pub path: String,
    pub max_connections: u32,
    pub auto_migrate: bool,
}

impl DatabaseConfig {
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            max_connections: 5,
            auto_migrate: true,
        }
    }

    /// In-memory databases live as long as their single connection
    pub fn in_memory() -> Self {
        Self {
            path: MEMORY.to_string(),
            max_connections: 1,
            auto_migrate: true,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            max_connections: config.db_max_connections,
            ..Self::with_path(config.database.clone())
        }
    }

    fn is_memory(&self) -> bool {
        self.path == MEMORY
    }
}

/// Connection pool wrapper; every store operation hangs off this type
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let (url, max_connections) = if config.is_memory() {
            ("sqlite::memory:".to_string(), 1)
        } else {
            (format!("sqlite:{}", config.path), config.max_connections)
        };

        let mut options = SqliteConnectOptions::from_str(&url)?
            .create_if_missing(true)
            .foreign_keys(true);
        if !config.is_memory() {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        info!("Connected to database {}", config.path);

        let db = Self { pool };
        if config.auto_migrate {
            db.migrate().await?;
        }
        Ok(db)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::new(DatabaseConfig::in_memory()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub async fn migration_status(&self) -> Result<migrations::MigrationStatus> {
        migrations::migration_status(&self.pool).await
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
