// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! Identity storage abstraction with a SQL implementation.
//!
//! The SQL store runs on a `sqlx` Any pool, so the same queries serve
//! PostgreSQL in production and SQLite for local runs and tests. Username
//! uniqueness is enforced by the table's `UNIQUE` constraint, never by a
//! check-then-insert.
use crate::config::DatabaseSettings;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::{AnyPool, FromRow};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Idempotent schema, portable between PostgreSQL and SQLite
pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    hashed_password TEXT NOT NULL,
    created_at BIGINT NOT NULL
)";

/// A registered account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    /// PHC-format password hash
    pub credential_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("username `{0}` already exists")]
    AlreadyExists(String),

    #[error("identity store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Trait for identity storage backends
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Create the backing tables if they are missing. Safe to repeat.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Insert a new identity, failing with [`StoreError::AlreadyExists`] on a duplicate username
    async fn create(&self, username: &str, credential_hash: &str) -> Result<Identity, StoreError>;

    /// Look up an identity; absence is `Ok(None)`
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError>;

    /// Round-trip to the store
    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    username: String,
    hashed_password: String,
    created_at: i64,
}

impl TryFrom<UserRow> for Identity {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| StoreError::Unavailable(format!("corrupt user id: {e}")))?;
        let created_at = Utc
            .timestamp_opt(row.created_at, 0)
            .single()
            .ok_or_else(|| StoreError::Unavailable("corrupt created_at".to_string()))?;
        Ok(Identity {
            id,
            username: row.username,
            credential_hash: row.hashed_password,
            created_at,
        })
    }
}

/// SQL implementation of [`IdentityStore`]
#[derive(Clone)]
pub struct SqlIdentityStore {
    pool: AnyPool,
}

impl SqlIdentityStore {
    /// Build the pool without connecting; the first query opens a connection.
    /// This lets the process start while the database is still down.
    pub fn new(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .connect_lazy(&settings.url)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

#[async_trait]
impl IdentityStore for SqlIdentityStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn create(&self, username: &str, credential_hash: &str) -> Result<Identity, StoreError> {
        let identity = Identity {
            id: Uuid::new_v4(),
            username: username.to_string(),
            credential_hash: credential_hash.to_string(),
            created_at: Utc::now(),
        };

        // Dropping the transaction on an error path rolls it back
        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            "INSERT INTO users (id, username, hashed_password, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(identity.id.to_string())
        .bind(identity.username.as_str())
        .bind(identity.credential_hash.as_str())
        .bind(identity.created_at.timestamp())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {},
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(StoreError::AlreadyExists(username.to_string()));
            },
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;

        // Second precision, matching what a later read returns
        Ok(Identity {
            created_at: Utc
                .timestamp_opt(identity.created_at.timestamp(), 0)
                .single()
                .unwrap_or(identity.created_at),
            ..identity
        })
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, hashed_password, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Identity::try_from).transpose()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sqlite_settings(dir: &std::path::Path) -> DatabaseSettings {
    DatabaseSettings {
        url: format!("sqlite://{}?mode=rwc", dir.join("accounts.db").display()),
        // A single connection keeps SQLite writers from tripping over file locks
        max_connections: 1,
        acquire_timeout_secs: 5,
    }
}
