//! Database management for the daemon.
//!
//! Provides a shared SQLite connection pool used by the session store,
//! the admin directory, and the link store.

use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub use sqlx::{SqlitePool as DbPool, sqlite::SqliteRow as DbRow};

/// Shared database handle.
///
/// Created once at startup; components receive clones of the pool.
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Connect to the database (creating the file if needed) and run all
    /// pending migrations.
    pub async fn new(config: &DatabaseConfig, data_dir: &Path) -> Result<Self> {
        let db_path = config
            .path
            .clone()
            .unwrap_or_else(|| data_dir.join("shortlinkd.db"));

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        info!(path = %db_path.display(), "Database connected");

        Ok(Self { pool })
    }

    /// Get a clone of the connection pool.
    ///
    /// The pool is cheap to clone (internally Arc-based).
    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }
}
