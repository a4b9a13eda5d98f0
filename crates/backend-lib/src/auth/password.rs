// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! Hashes are Argon2id in PHC string format, so the salt and cost parameters
//! travel with the hash and old hashes keep verifying after a cost change.
use crate::config::PasswordSettings;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;
use zeroize::Zeroizing;

/// Longest accepted password, in bytes
pub const MAX_PASSWORD_BYTES: usize = 1024;

#[derive(Error, Debug)]
pub enum HashError {
    #[error("password is {len} bytes, the limit is {max}")]
    InputTooLarge { len: usize, max: usize },

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("hashing worker failed: {0}")]
    Worker(String),
}

/// Argon2id hasher with a fixed cost
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    /// Hash of a throwaway password, verified against when a user does not exist
    dummy_hash: String,
}

impl CredentialHasher {
    pub fn new(settings: &PasswordSettings) -> Result<Self, HashError> {
        let params = Params::new(
            settings.memory_kib,
            settings.iterations,
            settings.parallelism,
            None,
        )
        .map_err(|e| HashError::Hashing(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_with(&argon2, "not-a-real-password")?;
        Ok(Self { argon2, dummy_hash })
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, plain: &str) -> Result<String, HashError> {
        check_len(plain)?;
        hash_with(&self.argon2, plain)
    }

    /// Verify a password against a stored hash. Malformed hashes and
    /// oversized input never verify.
    pub fn verify(&self, plain: &str, hash: &str) -> bool {
        if check_len(plain).is_err() {
            return false;
        }
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        self.argon2
            .verify_password(plain.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Burn the same work as a real verification and always fail
    pub fn verify_dummy(&self, plain: &str) -> bool {
        let _ = self.verify(plain, &self.dummy_hash);
        false
    }

    /// [`Self::hash`] on the blocking pool
    pub async fn hash_blocking(&self, plain: &str) -> Result<String, HashError> {
        check_len(plain)?;
        let hasher = self.clone();
        let plain = Zeroizing::new(plain.to_owned());
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| HashError::Worker(e.to_string()))?
    }

    /// [`Self::verify`] on the blocking pool. `None` for `hash` runs a dummy
    /// verification so a missing account costs the same as a wrong password.
    pub async fn verify_blocking(&self, plain: &str, hash: Option<&str>) -> Result<bool, HashError> {
        let hasher = self.clone();
        let plain = Zeroizing::new(plain.to_owned());
        let hash = hash.map(str::to_owned);
        tokio::task::spawn_blocking(move || match hash {
            Some(hash) => hasher.verify(&plain, &hash),
            None => hasher.verify_dummy(&plain),
        })
        .await
        .map_err(|e| HashError::Worker(e.to_string()))
    }
}

fn check_len(plain: &str) -> Result<(), HashError> {
    if plain.len() > MAX_PASSWORD_BYTES {
        return Err(HashError::InputTooLarge {
            len: plain.len(),
            max: MAX_PASSWORD_BYTES,
        });
    }
    Ok(())
}

fn hash_with(argon2: &Argon2<'static>, plain: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| HashError::Hashing(e.to_string()))?
        .to_string();
    Ok(hash)
}

#[cfg(test)]
pub(crate) fn fast_settings() -> PasswordSettings {
    PasswordSettings {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}
