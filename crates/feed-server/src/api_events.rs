//! Event feed handlers.

use crate::api::ApiError;
use crate::AppState;
use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    Extension, Json, Path, Query,
};
use feed_ledger::{FeedQuery, MAX_SYNTHETIC_BATCH};
use feed_types::{EventPage, EventRecord, NewEventsCount};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Handler for `GET /api/events`.
///
/// Serves the latest page, a backward page (`after_ts`/`after_id`), or a
/// refresh page (`before_ts`/`before_id`) depending on which parameters
/// are present.
pub async fn list_events_handler(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> Result<Json<EventPage>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let page = state.feed.query(&query)?;
    Ok(Json(page))
}

/// Handler for `GET /api/events/{id}`.
pub async fn get_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<Json<EventRecord>, ApiError> {
    let record = state.feed.get_by_id(&event_id)?;
    Ok(Json(record))
}

/// Query for `GET /api/events/new-count`.
#[derive(Debug, Deserialize)]
pub struct CountQuery {
    pub since_ts: Option<String>,
}

/// Handler for `GET /api/events/new-count`.
pub async fn new_events_count_handler(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<CountQuery>, QueryRejection>,
) -> Result<Json<NewEventsCount>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let raw = query
        .since_ts
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("the 'since_ts' parameter is required".to_string()))?;
    let since_ms: i64 = raw.parse().map_err(|_| {
        ApiError::BadRequest(format!(
            "the 'since_ts' parameter must be Unix milliseconds, got {:?}",
            raw
        ))
    })?;

    let counts = state.feed.count_newer_than(since_ms)?;
    Ok(Json(counts))
}

/// Request body for `POST /api/events/simulate`.
#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    #[serde(default = "default_simulate_count")]
    pub count: usize,
}

fn default_simulate_count() -> usize {
    1
}

/// Response body for `POST /api/events/simulate`.
#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub events: Vec<EventRecord>,
}

/// Handler for `POST /api/events/simulate`.
///
/// Appends `count` generated events as one batch and returns them.
pub async fn simulate_events_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<SimulateRequest>, JsonRejection>,
) -> Result<Json<SimulateResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if payload.count == 0 || payload.count > MAX_SYNTHETIC_BATCH {
        return Err(ApiError::BadRequest(format!(
            "count must be between 1 and {}",
            MAX_SYNTHETIC_BATCH
        )));
    }

    let events = state.feed.append_synthetic(payload.count)?;
    Ok(Json(SimulateResponse { events }))
}
