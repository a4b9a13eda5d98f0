use super::token::TokenError;
use crate::storage::{Identity, StoreError};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("username `{0}` is already taken")]
    UsernameTaken(String),

    #[error("identity store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Login failures. An unknown user and a wrong password are deliberately
/// the same variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("incorrect username or password")]
    InvalidCredentials,

    #[error("identity store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("password verification failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Token(TokenError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthenticateError {
    #[error(transparent)]
    Token(TokenError),

    #[error("token subject does not exist")]
    UnknownSubject,

    #[error("identity store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account. Does not log the user in.
    async fn register(&self, username: &str, password: &str) -> Result<Identity, RegisterError>;

    /// Check credentials and issue a bearer token
    async fn login(&self, username: &str, password: &str) -> Result<String, LoginError>;

    /// Resolve a bearer token to the identity it was issued for
    async fn authenticate(&self, token: &str) -> Result<Identity, AuthenticateError>;

    /// Initialize storage if needed and confirm the store answers
    async fn ready(&self) -> Result<(), StoreError>;
}
