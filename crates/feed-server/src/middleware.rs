use axum::{body::Body, http::Request, middleware::Next, response::Response};
use feed_identity::Subject;
use std::sync::Arc;

use crate::api::ApiError;
use crate::AppState;

/// Wrapper for the authenticated `Subject`, stored in request extensions.
#[derive(Clone, Debug)]
pub struct AuthContext(pub Subject);

/// Middleware to authenticate requests via `Authorization: Bearer <token>`.
///
/// Missing, malformed, forged, and expired tokens all yield 401 with the
/// standard error body.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("authorization header is required".to_string()))?;
    let header = header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("invalid authorization header".to_string()))?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ApiError::Unauthorized("authorization header must use Bearer scheme".to_string())
        })?;

    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or_else(|| ApiError::InternalServerError("application state missing".to_string()))?
        .clone();

    let subject = state.auth.validate(token).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(AuthContext(subject));

    Ok(next.run(req).await)
}
