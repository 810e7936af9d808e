//! Event feed server library logic.

pub mod api;
pub mod api_events;
pub mod api_files;
pub mod background;
pub mod config;
pub mod middleware;

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use feed_identity::Authenticator;
use feed_ledger::FeedService;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The event feed.
    pub feed: Arc<FeedService>,
    /// Credential and bearer-token verification.
    pub auth: Arc<dyn Authenticator>,
    /// Directory served under `/api/files/`.
    pub files_dir: PathBuf,
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/user/{id}", get(api::get_user_handler))
        .route("/api/events", get(api_events::list_events_handler))
        .route(
            "/api/events/new-count",
            get(api_events::new_events_count_handler),
        )
        .route(
            "/api/events/simulate",
            post(api_events::simulate_events_handler),
        )
        .route("/api/events/{id}", get(api_events::get_event_handler))
        .route(
            "/api/files/{filename}",
            get(api_files::download_file_handler),
        )
        .layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .route("/health", get(health))
        .route("/api/login", post(api::login_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
