// ============================
// crates/backend-lib/src/handlers/probes.rs
// ============================
//! Liveness, readiness, greeting and metrics exposition.
use crate::error::AppError;
use crate::AppState;
use account_common::HealthResponse;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// `GET /health`. Never touches storage.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// `GET /ready`. Runs first-use initialization if it has not happened yet.
pub async fn ready(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    state
        .auth
        .ready()
        .await
        .map_err(|e| AppError::ServiceUnavailable(e.to_string()))?;
    Ok(Json(HealthResponse {
        status: "ready".to_string(),
    }))
}

/// `GET /hello`
pub async fn hello() -> Json<Value> {
    Json(json!({ "hello": "world" }))
}

/// `GET /metrics`
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}
