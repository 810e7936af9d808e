#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use feed_identity::{Authenticator, LocalAuthenticator, Session, TokenSigner, UserDirectory};
use feed_ledger::{CatalogGenerator, FeedService, Ledger};
use feed_server::{app, AppState};
use feed_types::{EventDraft, EventRecord};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

pub const BASE_MS: i64 = 1_705_312_200_000;

pub fn record(ms: i64, id: &str, severity: &str) -> EventRecord {
    let timestamp: DateTime<Utc> = DateTime::from_timestamp_millis(ms).unwrap();
    EventRecord::new(
        id,
        timestamp,
        EventDraft {
            device_id: "DEVICE-001".to_string(),
            device_name: "Camera - Main Entrance".to_string(),
            event_type: "motion_detected".to_string(),
            severity: severity.to_string(),
            message: format!("event {id}"),
            location: "Main Entrance, Building A".to_string(),
            download_url: None,
        },
    )
}

/// `n` info records one second apart, newest at `BASE_MS + (n - 1) * 1000`.
pub fn spaced(n: usize) -> Vec<EventRecord> {
    (0..n)
        .map(|i| record(BASE_MS + i as i64 * 1000, &format!("evt-{i:04}"), "info"))
        .collect()
}

pub struct TestApp {
    pub router: Router,
    pub feed: Arc<FeedService>,
    pub auth: Arc<dyn Authenticator>,
    pub session: Session,
    pub other_session: Session,
}

impl TestApp {
    pub fn token(&self) -> &str {
        &self.session.token
    }
}

pub fn setup(records: Vec<EventRecord>, files_dir: PathBuf) -> TestApp {
    let mut users = UserDirectory::new();
    users
        .register("demo", "demo@example.com", "Demo User", "user", "demo123")
        .unwrap();
    users
        .register("other", "other@example.com", "Other User", "user", "other123")
        .unwrap();
    let auth: Arc<dyn Authenticator> = Arc::new(LocalAuthenticator::new(
        users,
        TokenSigner::new(b"integration-secret".to_vec(), 3600),
    ));
    let session = auth.authenticate("demo", "demo123").unwrap();
    let other_session = auth.authenticate("other", "other123").unwrap();

    let ledger = Ledger::with_seed(&records, Utc::now()).unwrap();
    let feed = Arc::new(FeedService::new(ledger, CatalogGenerator));

    let router = app(AppState {
        feed: feed.clone(),
        auth: auth.clone(),
        files_dir,
    });

    TestApp {
        router,
        feed,
        auth,
        session,
        other_session,
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

pub fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn event_ids(page: &Value) -> Vec<String> {
    page["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap().to_string())
        .collect()
}
