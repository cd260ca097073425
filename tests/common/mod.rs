// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use nexus_tracker::config::Config;
use nexus_tracker::db::{FirestoreDb, MemoryDb, Store};
use nexus_tracker::routes::create_router;
use nexus_tracker::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Build a router over `db` with the test config.
#[allow(dead_code)]
pub fn create_test_app_with_db(config: Config, db: Arc<dyn Store>) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, db).expect("Failed to build app state"));
    (create_router(state.clone()), state)
}

/// Create a test app backed by a fresh in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_db(Config::test_default(), Arc::new(MemoryDb::new()))
}

/// Create a test app whose store is offline; every database call fails.
#[allow(dead_code)]
pub fn create_offline_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_db(Config::test_default(), Arc::new(FirestoreDb::new_mock()))
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn get_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register `username` and return the session token.
#[allow(dead_code)]
pub async fn register(app: &axum::Router, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/register",
            None,
            serde_json::json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "correct horse battery",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Submit a check-in with `study_time` minutes.
#[allow(dead_code)]
pub async fn check_in(app: &axum::Router, token: &str, study_time: u32) -> Response<Body> {
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/checkins",
            Some(token),
            serde_json::json!({ "study_time": study_time }),
        ))
        .await
        .unwrap()
}
