// ============================
// crates/backend-lib/src/handlers/account.rs
// ============================
//! Account endpoints: register, token issuance and the current user.
use crate::error::AppError;
use crate::AppState;
use account_common::{CredentialsForm, TokenResponse, UserResponse};
use axum::{
    extract::{rejection::FormRejection, State},
    http::{header, HeaderMap},
    Form, Json,
};
use std::sync::Arc;

/// `POST /register`
pub async fn register(
    State(state): State<Arc<AppState>>,
    form: Result<Form<CredentialsForm>, FormRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let Form(form) = form.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let identity = state.auth.register(&form.username, &form.password).await?;
    Ok(Json(UserResponse {
        username: identity.username,
    }))
}

/// `POST /token`
pub async fn token(
    State(state): State<Arc<AppState>>,
    form: Result<Form<CredentialsForm>, FormRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Form(form) = form.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let access_token = state.auth.login(&form.username, &form.password).await?;
    Ok(Json(TokenResponse::bearer(access_token)))
}

/// `GET /users/me`
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
    let identity = state.auth.authenticate(token).await?;
    Ok(Json(UserResponse {
        username: identity.username,
    }))
}

/// Pull the token out of `Authorization: Bearer <token>`. The scheme is
/// matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
