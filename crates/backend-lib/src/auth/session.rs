// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session cache: the most recently issued token per user.
//!
//! The cache is advisory. Token validity is decided by the token itself, so
//! nothing here may block or fail a login.
use crate::config::CacheSettings;
use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::OnceCell;

/// Bound on connecting to and talking with the cache store
pub const CACHE_OP_TIMEOUT: Duration = Duration::from_secs(2);

/// After a failed connect, calls fail immediately for this long
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("session cache unavailable: {0}")]
    Unavailable(String),
}

/// Trait for session cache backends
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Remember `token` as the latest one issued to `username`
    async fn record(&self, username: &str, token: &str) -> Result<(), CacheError>;

    /// Best-effort read; failures are logged and read as a miss
    async fn get(&self, username: &str) -> Option<String>;
}

/// Cache key for a user's latest token
pub fn session_key(username: &str) -> String {
    format!("session:{username}")
}

/// Pick the backend from configuration: Redis when a URL is set, otherwise in-process
pub fn from_settings(settings: &CacheSettings) -> Result<Arc<dyn SessionCache>, CacheError> {
    match settings.url.as_deref() {
        Some(url) => Ok(Arc::new(RedisSessionCache::new(url)?)),
        None => {
            tracing::info!("no cache url configured, using in-process session cache");
            Ok(Arc::new(MemorySessionCache::new()))
        },
    }
}

/// Redis-backed session cache
pub struct RedisSessionCache {
    client: Client,
    /// Established on first use; a failed connect leaves it empty and is retried once the backoff expires
    connection: OnceCell<ConnectionManager>,
    /// Set after a failed connect; until then no new connect is attempted
    retry_after: Mutex<Option<Instant>>,
    op_timeout: Duration,
    backoff: Duration,
}

impl RedisSessionCache {
    /// Validate the URL without connecting
    pub fn new(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)
            .map_err(|e| CacheError::Unavailable(format!("invalid redis url: {e}")))?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
            retry_after: Mutex::new(None),
            op_timeout: CACHE_OP_TIMEOUT,
            backoff: RECONNECT_BACKOFF,
        })
    }

    /// Override the window during which connects are skipped after a failure
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn backing_off(&self) -> bool {
        match self.retry_after.lock() {
            Ok(guard) => guard.is_some_and(|deadline| Instant::now() < deadline),
            Err(poisoned) => poisoned
                .into_inner()
                .is_some_and(|deadline| Instant::now() < deadline),
        }
    }

    fn mark_failed(&self) {
        let deadline = Some(Instant::now() + self.backoff);
        match self.retry_after.lock() {
            Ok(mut guard) => *guard = deadline,
            Err(poisoned) => *poisoned.into_inner() = deadline,
        }
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        if let Some(conn) = self.connection.get() {
            return Ok(conn.clone());
        }
        if self.backing_off() {
            return Err(CacheError::Unavailable("reconnect backing off".to_string()));
        }

        let conn = self
            .connection
            .get_or_try_init(|| async {
                // Waiters queued behind a failed connect give up here
                if self.backing_off() {
                    return Err(CacheError::Unavailable("reconnect backing off".to_string()));
                }
                let connected = tokio::time::timeout(
                    self.op_timeout,
                    ConnectionManager::new(self.client.clone()),
                )
                .await
                .map_err(|_| CacheError::Unavailable("connect timed out".to_string()))
                .and_then(|r| r.map_err(|e| CacheError::Unavailable(e.to_string())));
                if connected.is_err() {
                    self.mark_failed();
                }
                connected
            })
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn record(&self, username: &str, token: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        tokio::time::timeout(
            self.op_timeout,
            conn.set::<_, _, ()>(session_key(username), token),
        )
        .await
        .map_err(|_| CacheError::Unavailable("SET timed out".to_string()))?
        .map_err(|e| CacheError::Unavailable(e.to_string()))
    }

    async fn get(&self, username: &str) -> Option<String> {
        let mut conn = match self.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "session cache read skipped");
                return None;
            },
        };
        match tokio::time::timeout(self.op_timeout, conn.get::<_, Option<String>>(session_key(username))).await {
            Ok(Ok(token)) => token,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "session cache read failed");
                None
            },
            Err(_) => {
                tracing::warn!("session cache read timed out");
                None
            },
        }
    }
}

/// In-process session cache
#[derive(Clone, Default)]
pub struct MemorySessionCache {
    sessions: Arc<DashMap<String, String>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn record(&self, username: &str, token: &str) -> Result<(), CacheError> {
        self.sessions
            .insert(session_key(username), token.to_string());
        Ok(())
    }

    async fn get(&self, username: &str) -> Option<String> {
        self.sessions
            .get(&session_key(username))
            .map(|entry| entry.value().clone())
    }
}
