//! Shared API error type, login, and user profile handlers.

use crate::middleware::AuthContext;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use feed_identity::{AuthError, Session, User};
use feed_ledger::FeedError;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::InternalServerError(msg) => msg,
        };

        let body = Json(serde_json::json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": message,
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<FeedError> for ApiError {
    fn from(e: FeedError) -> Self {
        match e {
            FeedError::Validation(v) => ApiError::BadRequest(v.to_string()),
            FeedError::NotFound(_) => {
                ApiError::NotFound("the requested event does not exist".to_string())
            }
            FeedError::DuplicateId(_) | FeedError::LockPoisoned => {
                tracing::error!(error = %e, "feed invariant violated");
                ApiError::InternalServerError("internal feed error".to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::TokenExpired => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::DuplicateUsername(_) | AuthError::Hashing(_) => {
                tracing::error!(error = %e, "authentication backend failure");
                ApiError::InternalServerError("authentication failed".to_string())
            }
        }
    }
}

/// Request body for `POST /api/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Handler for `POST /api/login`.
pub async fn login_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        tracing::info!("login attempt failed: invalid request format - {}", e);
        ApiError::BadRequest(e.body_text())
    })?;
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    tracing::info!(username = %payload.username, "login attempt");

    // Password verification is deliberately slow; keep it off the async workers.
    let auth = state.auth.clone();
    let session = tokio::task::spawn_blocking(move || {
        auth.authenticate(&payload.username, &payload.password)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(session))
}

/// Handler for `GET /api/user/{id}`.
///
/// Callers may only read their own profile.
pub async fn get_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(subject)): Extension<AuthContext>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    if subject.user_id != user_id {
        return Err(ApiError::Forbidden(
            "you can only view your own profile".to_string(),
        ));
    }

    state
        .auth
        .find_user(&user_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("the requested user does not exist".to_string()))
}
