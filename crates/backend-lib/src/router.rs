// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router and request instrumentation.
use crate::handlers::{account, probes};
use crate::metrics::{HTTP_REQUESTS, HTTP_REQUEST_DURATION};
use crate::AppState;
use axum::{
    extract::{MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Create the account service router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/register", post(account::register))
        .route("/token", post(account::token))
        .route("/users/me", get(account::me))
        .route("/health", get(probes::health))
        .route("/ready", get(probes::ready))
        .route("/hello", get(probes::hello))
        .route("/metrics", get(probes::metrics))
        .layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Count requests and record their latency, labelled by route template
async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());

    let response = next.run(request).await;
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS, "method" => method.clone(), "path" => path.clone(), "status" => status)
        .increment(1);
    histogram!(HTTP_REQUEST_DURATION, "method" => method, "path" => path)
        .record(start.elapsed().as_secs_f64());

    response
}
