// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
/** Bearer token minting and validation
Tokens are HMAC-signed JWTs carrying `sub`, `iat` and `exp` (unix seconds).
Expiry is checked against an injectable [`Clock`] rather than the library's
own wall clock, so tests can move time. */
use crate::config::{ConfigError, TokenSettings};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    unix_secs: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            unix_secs: AtomicI64::new(start.timestamp()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.unix_secs
            .fetch_add(by.as_secs() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.unix_secs.load(Ordering::SeqCst);
        Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
    }
}

/// Why a token was rejected. Kept distinct so a forged token can be told
/// apart from a stale one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token could not be signed: {0}")]
    Encoding(String),
}

/// Signed claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Username the token was issued for
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Mints and validates bearer tokens with one secret and algorithm
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(secret: &[u8], algorithm: Algorithm, clock: Arc<dyn Clock>) -> Self {
        Self {
            algorithm,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            clock,
        }
    }

    pub fn from_settings(settings: &TokenSettings, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let algorithm = settings.hmac_algorithm()?;
        Ok(Self::new(settings.secret.as_bytes(), algorithm, clock))
    }

    /// Issue a token for `subject` that expires `ttl` from now
    pub fn mint(&self, subject: &str, ttl: Duration) -> Result<String, TokenError> {
        let iat = self.clock.now().timestamp();
        let ttl = i64::try_from(ttl.as_secs())
            .map_err(|_| TokenError::Encoding("ttl out of range".to_string()))?;
        let exp = iat
            .checked_add(ttl)
            .ok_or_else(|| TokenError::Encoding("ttl out of range".to_string()))?;
        let claims = Claims {
            sub: subject.to_string(),
            iat,
            exp,
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Check signature and expiry, returning the claims
    pub fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is checked below against our own clock
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::BadSignature,
                _ => TokenError::Malformed,
            }
        })?;

        if self.clock.now().timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }

    /// Validate a token and return its subject
    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        self.decode_claims(token).map(|claims| claims.sub)
    }
}
