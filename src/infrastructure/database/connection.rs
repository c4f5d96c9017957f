//! Database connection pool manager.
//!
//! Manages the SQLite connection pool with WAL mode enabled for better
//! concurrency. Handles connection lifecycle, migrations, and configuration.

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Create a new database connection pool with WAL mode enabled.
    ///
    /// `database_url` is a SQLite URL, e.g. `sqlite:/home/u/.maxclaw/data.db`
    /// or `sqlite::memory:`.
    ///
    /// Pragmas: WAL journal, NORMAL synchronous, foreign keys ON (cascade
    /// deletes depend on it), 5 s busy timeout.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        // An in-memory database exists per connection, so pooling beyond a
        // single connection would scatter the schema.
        let is_memory = database_url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(if is_memory { 1 } else { 10 })
            .idle_timeout(if is_memory {
                None
            } else {
                Some(Duration::from_secs(30))
            })
            .max_lifetime(if is_memory {
                None
            } else {
                Some(Duration::from_secs(1800))
            })
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .context("failed to create connection pool")?;

        Ok(Self { pool })
    }

    /// Run pending migrations. Safe to call repeatedly.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run migrations")?;
        Ok(())
    }

    /// Pool handle for repository implementations.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections; called during shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_pool_creation() {
        let db = DatabaseConnection::new("sqlite::memory:")
            .await
            .expect("failed to create database connection");
        assert!(!db.pool().is_closed());
        db.close().await;
        assert!(db.pool().is_closed());
    }

    #[tokio::test]
    async fn test_migrations_create_schema() {
        let db = DatabaseConnection::new("sqlite::memory:")
            .await
            .expect("failed to create database connection");
        db.migrate().await.expect("failed to run migrations");

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .expect("failed to query tables");
        let names: Vec<String> = tables.into_iter().map(|t| t.0).collect();

        for expected in [
            "projects",
            "sessions",
            "activities",
            "schedules",
            "schedule_logs",
            "teams",
            "team_members",
            "team_tasks",
            "team_sessions",
        ] {
            assert!(
                names.iter().any(|n| n == expected),
                "{expected} table should exist, got {names:?}"
            );
        }

        db.close().await;
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = DatabaseConnection::new("sqlite::memory:")
            .await
            .expect("failed to create database connection");
        let row: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .expect("failed to read pragma");
        assert_eq!(row.0, 1, "foreign keys should be enabled");
        db.close().await;
    }
}
