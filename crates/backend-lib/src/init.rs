// ============================
// crates/backend-lib/src/init.rs
// ============================
//! First-use initialization gate.
//!
//! `Uninitialized -> Initializing -> Ready`. Exactly one caller runs the
//! bootstrap at a time; everyone else waits on the same gate. A failed or
//! cancelled bootstrap drops back to `Uninitialized` so the next caller
//! retries. There is no way back from `Ready`.
use crate::metrics::{INIT_ATTEMPT, INIT_FAILURE};
use metrics::counter;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Initializing,
    Ready,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error("initialization did not complete within {0:?}")]
    Timeout(Duration),

    #[error("initialization failed: {0}")]
    Failed(String),
}

#[derive(Debug)]
pub struct LazyInit {
    gate: OnceCell<()>,
    state: AtomicU8,
    attempts: AtomicU64,
    timeout: Duration,
}

/// Resets the state unless the bootstrap finished
struct Attempt<'a> {
    state: &'a AtomicU8,
    done: bool,
}

impl<'a> Attempt<'a> {
    fn begin(state: &'a AtomicU8) -> Self {
        state.store(INITIALIZING, Ordering::SeqCst);
        Self { state, done: false }
    }

    fn finish(mut self) {
        self.state.store(READY, Ordering::SeqCst);
        self.done = true;
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.state.store(UNINITIALIZED, Ordering::SeqCst);
        }
    }
}

impl LazyInit {
    /// `timeout` bounds how long any one caller waits for readiness
    pub fn new(timeout: Duration) -> Self {
        Self {
            gate: OnceCell::new(),
            state: AtomicU8::new(UNINITIALIZED),
            attempts: AtomicU64::new(0),
            timeout,
        }
    }

    pub fn state(&self) -> InitState {
        match self.state.load(Ordering::SeqCst) {
            READY => InitState::Ready,
            INITIALIZING => InitState::Initializing,
            _ => InitState::Uninitialized,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.gate.initialized()
    }

    /// Number of times a bootstrap has been started
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Run `bootstrap` unless initialization already completed, waiting for
    /// any in-flight attempt first.
    pub async fn ensure_ready<F, Fut, E>(&self, bootstrap: F) -> Result<(), InitError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        if self.gate.initialized() {
            return Ok(());
        }

        let init = self.gate.get_or_try_init(|| async {
            let attempt = Attempt::begin(&self.state);
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            counter!(INIT_ATTEMPT).increment(1);
            tracing::info!(attempt = n, "initializing storage schema");

            match bootstrap().await {
                Ok(()) => {
                    attempt.finish();
                    tracing::info!(attempt = n, "storage schema ready");
                    Ok(())
                },
                Err(e) => {
                    counter!(INIT_FAILURE).increment(1);
                    tracing::error!(attempt = n, error = %e, "storage schema initialization failed");
                    Err(InitError::Failed(e.to_string()))
                },
            }
        });

        match tokio::time::timeout(self.timeout, init).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "gave up waiting for initialization");
                Err(InitError::Timeout(self.timeout))
            },
        }
    }
}
