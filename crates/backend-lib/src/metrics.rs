// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for Prometheus metric keys, plus the recorder setup used by
//! the binary.
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const REGISTER_SUCCESS: &str = "account.register.success";
pub const REGISTER_CONFLICT: &str = "account.register.conflict";
pub const REGISTER_FAILURE: &str = "account.register.failure";
pub const LOGIN_SUCCESS: &str = "account.login.success";
pub const LOGIN_FAILURE: &str = "account.login.failure";
pub const SESSION_CACHE_FAILURE: &str = "account.session_cache.failure";
pub const INIT_ATTEMPT: &str = "account.init.attempt";
pub const INIT_FAILURE: &str = "account.init.failure";
pub const HTTP_REQUESTS: &str = "http.requests";
pub const HTTP_REQUEST_DURATION: &str = "http.request.duration_seconds";

/// Latency buckets in seconds; password hashing dominates, so they reach well past 100ms
pub const LATENCY_BUCKETS: [f64; 10] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Install the global Prometheus recorder and return a handle for `/metrics`
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets(&LATENCY_BUCKETS)?
        .install_recorder()
}

/// Build a handle without installing it globally. Renders an empty
/// exposition; used when another recorder is already installed (tests).
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
