// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core functionality for the account service: credential hashing, bearer
//! tokens, the identity store and the HTTP surface on top of them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod init;
pub mod metrics;
pub mod router;
pub mod storage;

use crate::auth::{session, AuthService, CredentialHasher, SessionService, SystemClock, TokenCodec};
use crate::config::Settings;
use crate::storage::SqlIdentityStore;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Registration, login and token checks
    pub auth: Arc<dyn AuthService>,
    /// Settings the process was started with
    pub settings: Arc<Settings>,
    /// Rendered by `GET /metrics`
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Wire up the store, cache, hasher and token codec from settings.
    /// Nothing here touches the network; connections are made on first use.
    pub fn new(settings: Settings, metrics: PrometheusHandle) -> Result<Self, anyhow::Error> {
        let store = Arc::new(SqlIdentityStore::new(&settings.database)?);
        let cache = session::from_settings(&settings.cache)?;
        let hasher = CredentialHasher::new(&settings.password)?;
        let tokens = TokenCodec::from_settings(&settings.token, Arc::new(SystemClock))?;

        let service = SessionService::new(
            store,
            cache,
            hasher,
            tokens,
            settings.token.ttl(),
            settings.init_timeout(),
        );

        Ok(Self::with_service(Arc::new(service), settings, metrics))
    }

    /// Build state around an existing service
    pub fn with_service(
        auth: Arc<dyn AuthService>,
        settings: Settings,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            auth,
            settings: Arc::new(settings),
            metrics,
        }
    }
}
