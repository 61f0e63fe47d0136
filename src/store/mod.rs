//! Persistence layer over a pooled SQLite connection.
//!
//! The store exposes a narrow interface per table (insert, get, conditional
//! update, delete, list) and nothing else; SQL never leaks past this module.
//! Every operation is bounded by a short per-call deadline so a wedged
//! connection surfaces as an error instead of hanging the request task.
//!
//! # Optimistic concurrency
//!
//! Mutations on versioned rows are single conditional statements
//! (`... WHERE id = ? AND version = ?`). The at-most-one-winner guarantee
//! lives entirely in that statement; it must never be split into a
//! read-then-write at this layer.

mod mangas;
mod permissions;
mod tokens;
mod users;

use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{AppError, AppResult};

pub use mangas::MangaStore;
pub use permissions::PermissionStore;
pub use tokens::TokenStore;
pub use users::UserStore;

/// Table definitions. Executed idempotently at startup.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS mangas (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    title    TEXT    NOT NULL,
    studio   TEXT    NOT NULL,
    year     INTEGER NOT NULL,
    chapters INTEGER NOT NULL,
    rating   REAL    NOT NULL,
    version  INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at    TEXT    NOT NULL,
    name          TEXT    NOT NULL,
    email         TEXT    NOT NULL UNIQUE,
    password_hash BLOB    NOT NULL,
    activated     INTEGER NOT NULL DEFAULT 0,
    version       INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS tokens (
    hash    BLOB    PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    expiry  TEXT    NOT NULL,
    scope   TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS permissions (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT    NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS users_permissions (
    user_id       INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    permission_id INTEGER NOT NULL REFERENCES permissions (id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, permission_id)
);

INSERT OR IGNORE INTO permissions (code) VALUES ('mangas:read');
INSERT OR IGNORE INTO permissions (code) VALUES ('mangas:write');
";

/// Handle to the connection pool plus the per-call deadline.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
    query_timeout: Duration,
}

impl Db {
    /// Open the pool, apply the schema, and seed the permission codes.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        query_timeout: Duration,
    ) -> AppResult<Self> {
        let options: SqliteConnectOptions = url
            .parse::<SqliteConnectOptions>()
            .map_err(|e| AppError::ConfigError(format!("invalid DATABASE_URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(query_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(query_timeout)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Persistence(format!("failed to open database pool: {e}")))?;

        let db = Self {
            pool,
            query_timeout,
        };
        db.migrate().await?;

        info!(max_connections, "Database pool established");
        Ok(db)
    }

    async fn migrate(&self) -> AppResult<()> {
        self.bounded(sqlx::raw_sql(SCHEMA).execute(&self.pool))
            .await?;
        Ok(())
    }

    /// Close the pool. Called once during graceful shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run a store future under the configured deadline. An overrun aborts
    /// the in-flight operation and surfaces as an error; the conditional
    /// statements used for mutation are atomic, so no partial write can be
    /// observed.
    pub(crate) async fn bounded<T, F>(&self, fut: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(AppError::StoreTimeout(self.query_timeout)),
        }
    }
}

/// All per-table stores, sharing one pool.
#[derive(Clone)]
pub struct Store {
    pub mangas: MangaStore,
    pub users: UserStore,
    pub tokens: TokenStore,
    pub permissions: PermissionStore,
}

impl Store {
    pub fn new(db: Db) -> Self {
        Self {
            mangas: MangaStore::new(db.clone()),
            users: UserStore::new(db.clone()),
            tokens: TokenStore::new(db.clone()),
            permissions: PermissionStore::new(db),
        }
    }
}
