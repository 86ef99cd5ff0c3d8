//! SQLite persistence: pool setup, embedded migrations, and one repository
//! per entity. Handlers only see the `UserRepository` / `ProblemRepository`
//! traits; SQL stays in this module.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{info, instrument};

use crate::error::AppError;

pub mod problems;
pub mod users;

pub use problems::{ProblemRepository, SqliteProblems};
pub use users::{SqliteUsers, UserRepository};

/// Open (creating if needed) the database file and bring the schema up to date.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn connect(path: &Path) -> Result<SqlitePool, AppError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| {
            AppError::Internal(format!("create data directory {}: {e}", dir.display()))
        })?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), AppError> {
    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Migration error: {e}")))?;
    info!("Migrations completed successfully");
    Ok(())
}

#[cfg(test)]
pub mod testing {
    use std::str::FromStr;

    use super::*;

    /// Single-connection in-memory database with the schema applied.
    /// The connection is pinned so the database lives as long as the pool.
    pub async fn memory_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        migrate(&pool).await.unwrap();
        pool
    }
}
