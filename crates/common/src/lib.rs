// ================
// crates/common/src/lib.rs
// ================
//! Common request and response types
//! used for communication between account-service clients and the server.
//! Request bodies are form-encoded, responses are JSON.

use serde::{Deserialize, Serialize};

/// Token type reported alongside every access token
pub const BEARER: &str = "bearer";

/// Form body accepted by `POST /register` and `POST /token`
/// # Fields
/// * `username` - Case-sensitive account name
/// * `password` - Plaintext password, only ever hashed server-side
/// Missing fields decode as empty and are rejected by the service.
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for CredentialsForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsForm")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response to a successful registration or `GET /users/me`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserResponse {
    pub username: String,
}

/// Response to a successful login
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    /// Signed bearer token
    pub access_token: String,
    /// Always `"bearer"`
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: BEARER.to_string(),
        }
    }
}

/// Liveness / readiness probe body
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

/// Error body returned by every failing endpoint
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Stable machine-readable code, e.g. `AUTH_001`
    pub code: String,
    /// Sanitized human-readable message
    pub message: String,
}
