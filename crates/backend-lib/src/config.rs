// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! `ACCOUNT_`-prefixed environment variables (nested keys use `__`,
//! e.g. `ACCOUNT_TOKEN__SECRET`).
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ACCOUNT_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level (`trace` .. `error`), overridden by `RUST_LOG`
    pub log_level: String,
    /// `text` or `json`
    pub log_format: String,
    /// Relational store
    pub database: DatabaseSettings,
    /// Session cache store
    pub cache: CacheSettings,
    /// Token signing
    pub token: TokenSettings,
    /// Password hashing work factor
    pub password: PasswordSettings,
    /// Upper bound on how long a request waits for schema initialization
    pub init_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// `postgres://...` in production, `sqlite://...` for local runs and tests
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    /// `redis://...`; when unset an in-process cache is used
    pub url: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TokenSettings {
    /// Shared HMAC secret
    pub secret: String,
    /// `HS256`, `HS384` or `HS512`
    pub algorithm: String,
    /// Token lifetime
    pub expire_minutes: u64,
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("expire_minutes", &self.expire_minutes)
            .finish()
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8001)),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            database: DatabaseSettings::default(),
            cache: CacheSettings::default(),
            token: TokenSettings::default(),
            password: PasswordSettings::default(),
            init_timeout_secs: 10,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://account.db?mode=rwc".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            algorithm: "HS256".to_string(),
            expire_minutes: 30,
        }
    }
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

impl Settings {
    /// Load settings from `config.toml` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(DEFAULT_CONFIG_FILE))
    }

    /// Load settings from an explicit TOML file and the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(path))
    }

    fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check invariants the rest of the service relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log level `{}`",
                self.log_level
            )));
        }
        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log format `{}`",
                self.log_format
            )));
        }
        if self.database.url.is_empty() {
            return Err(ConfigError::Invalid("database.url must be set".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be positive".into(),
            ));
        }
        if self.token.secret.is_empty() {
            return Err(ConfigError::Invalid("token.secret must be set".into()));
        }
        self.token.hmac_algorithm()?;
        if self.token.expire_minutes == 0 {
            return Err(ConfigError::Invalid(
                "token.expire_minutes must be positive".into(),
            ));
        }
        argon2::Params::new(
            self.password.memory_kib,
            self.password.iterations,
            self.password.parallelism,
            None,
        )
        .map_err(|e| ConfigError::Invalid(format!("password cost parameters: {e}")))?;
        if self.init_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "init_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }
}

impl TokenSettings {
    /// Parse the configured algorithm, accepting only shared-secret (HMAC) variants
    pub fn hmac_algorithm(&self) -> Result<Algorithm, ConfigError> {
        let algorithm = Algorithm::from_str(&self.algorithm).map_err(|_| {
            ConfigError::Invalid(format!("unknown token algorithm `{}`", self.algorithm))
        })?;
        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
            other => Err(ConfigError::Invalid(format!(
                "token algorithm {other:?} needs a key pair, only HS256/HS384/HS512 are supported"
            ))),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.expire_minutes * 60)
    }
}
