// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Input validation at the HTTP boundary.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, get_request, json_request, register};

#[tokio::test]
async fn test_register_rejects_invalid_fields() {
    let (app, _) = common::create_test_app();

    for body in [
        json!({ "username": "ab", "email": "ab@example.com", "password": "long enough" }),
        json!({ "username": "bad name", "email": "b@example.com", "password": "long enough" }),
        json!({ "username": "carol", "email": "not-an-email", "password": "long enough" }),
        json!({ "username": "dave", "email": "d@example.com", "password": "short" }),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/auth/register", None, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "bad_request");
    }
}

#[tokio::test]
async fn test_checkin_rejects_out_of_range_study_time() {
    let (app, _) = common::create_test_app();
    let token = register(&app, "ada").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/checkins",
            Some(&token),
            json!({ "study_time": 1441 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Negative values never reach the service
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/checkins",
            Some(&token),
            json!({ "study_time": -5 }),
        ))
        .await
        .unwrap();
    assert!(response.status().is_client_error());

    // Nothing was recorded
    let me = body_json(app.oneshot(get_request("/api/me", &token)).await.unwrap()).await;
    assert_eq!(me["streak_count"], 0);
}

#[tokio::test]
async fn test_checkin_rejects_bad_subjects_and_notes() {
    let (app, _) = common::create_test_app();
    let token = register(&app, "ada").await;

    let too_many: Vec<String> = (0..21).map(|i| format!("subject-{i}")).collect();
    for body in [
        json!({ "study_time": 30, "subjects": too_many }),
        json!({ "study_time": 30, "subjects": ["   "] }),
        json!({ "study_time": 30, "subjects": ["x".repeat(65)] }),
        json!({ "study_time": 30, "notes": "n".repeat(2001) }),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/checkins", Some(&token), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_preferences_update_and_validation() {
    let (app, _) = common::create_test_app();
    let token = register(&app, "ada").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/preferences",
            Some(&token),
            json!({
                "subjects": ["math", " math ", "chemistry"],
                "study_time_preference": "night",
                "collaboration_level": "high",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let prefs = &body_json(response).await["learning_preferences"];
    assert_eq!(prefs["subjects"], json!(["math", "chemistry"]));
    assert_eq!(prefs["study_time_preference"], "night");
    assert_eq!(prefs["collaboration_level"], "high");

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/preferences",
            Some(&token),
            json!({ "study_time_preference": "dawn" }),
        ))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_history_limit_is_clamped() {
    let (app, _) = common::create_test_app();
    let token = register(&app, "ada").await;
    assert_eq!(
        common::check_in(&app, &token, 15).await.status(),
        StatusCode::OK
    );

    for uri in ["/api/checkins?limit=0", "/api/checkins?limit=1000", "/api/checkins"] {
        let response = app.clone().oneshot(get_request(uri, &token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let checkins = body_json(response).await["checkins"].clone();
        assert_eq!(checkins.as_array().unwrap().len(), 1);
    }
}
