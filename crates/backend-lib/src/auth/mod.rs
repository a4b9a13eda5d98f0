// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod service;
mod service_impl;
pub mod session;
pub mod token;

pub use password::{CredentialHasher, HashError, MAX_PASSWORD_BYTES};
pub use service::{AuthService, AuthenticateError, LoginError, RegisterError};
pub use service_impl::SessionService;
pub use session::{MemorySessionCache, RedisSessionCache, SessionCache};
pub use token::{Clock, ManualClock, SystemClock, TokenCodec, TokenError};
