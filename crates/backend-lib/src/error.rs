// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use crate::auth::service::{AuthenticateError, LoginError, RegisterError};
use account_common::{ErrorDetail, ErrorResponse};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors surfaced at the HTTP boundary
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown user and wrong password both land here
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Conflict(_) => "CONFLICT_001",
            AppError::InvalidCredentials => "AUTH_001",
            AppError::Unauthorized(_) => "AUTH_002",
            AppError::ServiceUnavailable(_) => "SVC_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Message safe to show to clients. Input errors carry our own wording;
    /// everything else is replaced with a fixed string.
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Conflict(_) => "Username already registered".to_string(),
            AppError::InvalidCredentials => "Incorrect username or password".to_string(),
            AppError::Unauthorized(_) => "Could not validate credentials".to_string(),
            AppError::ServiceUnavailable(_) => {
                "Service temporarily unavailable, please try again later".to_string()
            },
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.sanitized_message(),
            },
        };

        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<RegisterError> for AppError {
    fn from(err: RegisterError) -> Self {
        match err {
            RegisterError::InvalidInput(msg) => AppError::InvalidInput(msg),
            RegisterError::UsernameTaken(name) => AppError::Conflict(name),
            RegisterError::StoreUnavailable(msg) | RegisterError::ServiceUnavailable(msg) => {
                AppError::ServiceUnavailable(msg)
            },
            RegisterError::Hashing(msg) => AppError::Internal(msg),
        }
    }
}

impl From<LoginError> for AppError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::InvalidCredentials => AppError::InvalidCredentials,
            LoginError::StoreUnavailable(msg) | LoginError::ServiceUnavailable(msg) => {
                AppError::ServiceUnavailable(msg)
            },
            LoginError::Hashing(msg) => AppError::Internal(msg),
            LoginError::Token(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<AuthenticateError> for AppError {
    fn from(err: AuthenticateError) -> Self {
        match err {
            AuthenticateError::Token(e) => AppError::Unauthorized(e.to_string()),
            AuthenticateError::UnknownSubject => {
                AppError::Unauthorized("token subject no longer exists".to_string())
            },
            AuthenticateError::StoreUnavailable(msg)
            | AuthenticateError::ServiceUnavailable(msg) => AppError::ServiceUnavailable(msg),
        }
    }
}
