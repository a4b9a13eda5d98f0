use super::password::{CredentialHasher, HashError, MAX_PASSWORD_BYTES};
use super::service::{AuthService, AuthenticateError, LoginError, RegisterError};
use super::session::SessionCache;
use super::token::TokenCodec;
use crate::init::{InitError, InitState, LazyInit};
use crate::metrics::{
    LOGIN_FAILURE, LOGIN_SUCCESS, REGISTER_CONFLICT, REGISTER_FAILURE, REGISTER_SUCCESS,
    SESSION_CACHE_FAILURE,
};
use crate::storage::{Identity, IdentityStore, StoreError};
use async_trait::async_trait;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;

/// Registration and login on top of an identity store, a session cache and a token codec
pub struct SessionService {
    store: Arc<dyn IdentityStore>,
    cache: Arc<dyn SessionCache>,
    hasher: CredentialHasher,
    tokens: TokenCodec,
    token_ttl: Duration,
    init: LazyInit,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        cache: Arc<dyn SessionCache>,
        hasher: CredentialHasher,
        tokens: TokenCodec,
        token_ttl: Duration,
        init_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            hasher,
            tokens,
            token_ttl,
            init: LazyInit::new(init_timeout),
        }
    }

    pub fn init_state(&self) -> InitState {
        self.init.state()
    }

    pub fn init_attempts(&self) -> u64 {
        self.init.attempts()
    }

    async fn ensure_ready(&self) -> Result<(), InitError> {
        let store = self.store.clone();
        self.init
            .ensure_ready(|| async move { store.ensure_schema().await })
            .await
    }
}

fn check_credentials(username: &str, password: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("username must not be empty".to_string());
    }
    if password.is_empty() {
        return Err("password must not be empty".to_string());
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(format!("password must be at most {MAX_PASSWORD_BYTES} bytes"));
    }
    Ok(())
}

/// Write the token to the session cache in a detached task. Login never waits
/// on the cache; the task finishes on its own and reports its own failures.
fn record_session(cache: Arc<dyn SessionCache>, username: String, token: String) {
    tokio::spawn(async move {
        if let Err(e) = cache.record(&username, &token).await {
            counter!(SESSION_CACHE_FAILURE).increment(1);
            tracing::warn!(username = %username, error = %e, "failed to cache session token");
        }
    });
}

#[async_trait]
impl AuthService for SessionService {
    async fn register(&self, username: &str, password: &str) -> Result<Identity, RegisterError> {
        check_credentials(username, password).map_err(RegisterError::InvalidInput)?;

        self.ensure_ready()
            .await
            .map_err(|e| RegisterError::ServiceUnavailable(e.to_string()))?;

        let hash = self.hasher.hash_blocking(password).await.map_err(|e| match e {
            HashError::InputTooLarge { .. } => RegisterError::InvalidInput(e.to_string()),
            other => RegisterError::Hashing(other.to_string()),
        })?;

        // Spawned so the insert finishes even if the caller goes away
        let store = self.store.clone();
        let owned_username = username.to_string();
        let created = tokio::spawn(async move { store.create(&owned_username, &hash).await })
            .await
            .map_err(|e| RegisterError::StoreUnavailable(e.to_string()))?;

        match created {
            Ok(identity) => {
                counter!(REGISTER_SUCCESS).increment(1);
                tracing::info!(username = %identity.username, "registered new identity");
                Ok(identity)
            },
            Err(StoreError::AlreadyExists(name)) => {
                counter!(REGISTER_CONFLICT).increment(1);
                tracing::debug!(username = %name, "registration rejected, username taken");
                Err(RegisterError::UsernameTaken(name))
            },
            Err(StoreError::Unavailable(msg)) => {
                counter!(REGISTER_FAILURE).increment(1);
                tracing::warn!(error = %msg, "registration failed");
                Err(RegisterError::StoreUnavailable(msg))
            },
        }
    }

    async fn login(&self, username: &str, password: &str) -> Result<String, LoginError> {
        if username.is_empty() || password.is_empty() {
            counter!(LOGIN_FAILURE).increment(1);
            return Err(LoginError::InvalidCredentials);
        }

        self.ensure_ready()
            .await
            .map_err(|e| LoginError::ServiceUnavailable(e.to_string()))?;

        let identity = self
            .store
            .find_by_username(username)
            .await
            .map_err(|e| LoginError::StoreUnavailable(e.to_string()))?;

        // Unknown users still pay for a verification
        let verified = self
            .hasher
            .verify_blocking(password, identity.as_ref().map(|i| i.credential_hash.as_str()))
            .await
            .map_err(|e| LoginError::Hashing(e.to_string()))?;

        let identity = match identity {
            Some(identity) if verified => identity,
            _ => {
                counter!(LOGIN_FAILURE).increment(1);
                tracing::debug!("login rejected");
                return Err(LoginError::InvalidCredentials);
            },
        };

        let token = self
            .tokens
            .mint(&identity.username, self.token_ttl)
            .map_err(LoginError::Token)?;

        record_session(self.cache.clone(), identity.username.clone(), token.clone());

        counter!(LOGIN_SUCCESS).increment(1);
        tracing::info!(username = %identity.username, "issued access token");
        Ok(token)
    }

    async fn authenticate(&self, token: &str) -> Result<Identity, AuthenticateError> {
        let subject = self.tokens.validate(token).map_err(AuthenticateError::Token)?;

        self.ensure_ready()
            .await
            .map_err(|e| AuthenticateError::ServiceUnavailable(e.to_string()))?;

        match self.store.find_by_username(&subject).await {
            Ok(Some(identity)) => Ok(identity),
            Ok(None) => Err(AuthenticateError::UnknownSubject),
            Err(e) => Err(AuthenticateError::StoreUnavailable(e.to_string())),
        }
    }

    async fn ready(&self) -> Result<(), StoreError> {
        self.ensure_ready()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        self.store.ping().await
    }
}
