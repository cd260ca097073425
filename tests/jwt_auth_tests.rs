// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Session token validation through the auth middleware.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use tower::ServiceExt;

mod common;
use common::{body_json, get_request, register};

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: usize,
    iat: usize,
}

fn now() -> usize {
    chrono::Utc::now().timestamp() as usize
}

fn sign(claims: &Claims, algorithm: Algorithm, key: &[u8]) -> String {
    encode(&Header::new(algorithm), claims, &EncodingKey::from_secret(key)).unwrap()
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let (app, state) = common::create_test_app();
    let token = sign(
        &Claims {
            sub: "whoever".to_string(),
            iat: now() - 7200,
            exp: now() - 3600,
        },
        Algorithm::HS256,
        &state.config.jwt_signing_key,
    );

    let response = app.oneshot(get_request("/api/me", &token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_token");
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let (app, _) = common::create_test_app();
    let token = sign(
        &Claims {
            sub: "whoever".to_string(),
            iat: now(),
            exp: now() + 3600,
        },
        Algorithm::HS256,
        b"an_entirely_different_signing_key",
    );

    let response = app.oneshot(get_request("/api/me", &token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_other_algorithm_rejected() {
    let (app, state) = common::create_test_app();
    let token = sign(
        &Claims {
            sub: "whoever".to_string(),
            iat: now(),
            exp: now() + 3600,
        },
        Algorithm::HS512,
        &state.config.jwt_signing_key,
    );

    let response = app.oneshot(get_request("/api/me", &token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_bearer_authorization_rejected() {
    let (app, _) = common::create_test_app();
    let token = register(&app, "ada").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::AUTHORIZATION, format!("Token {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cookie_takes_precedence_over_header() {
    let (app, _) = common::create_test_app();
    let ada = register(&app, "ada").await;
    let bob = register(&app, "bob").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, format!("nexus_token={ada}"))
                .header(header::AUTHORIZATION, format!("Bearer {bob}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["username"], "ada");
}
