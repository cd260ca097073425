// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Registration, login and logout.
//!
//! Successful registration and login return the session token in the body
//! and also set it as an HttpOnly cookie.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, removal_cookie, session_cookie};
use crate::models::User;
use crate::routes::api::UserResponse;
use crate::services::accounts::RegisterForm;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

/// Session established by register or login.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Issue a session for `user`: JWT in the body and in the cookie jar.
fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: User,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let token = create_jwt(
        &user.id,
        &state.config.jwt_signing_key,
        state.config.session_ttl_days,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let jar = jar.add(session_cookie(&state.config, token.clone()));

    Ok((
        jar,
        Json(SessionResponse {
            user: user.into(),
            token,
        }),
    ))
}

async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(form): Json<RegisterForm>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>)> {
    let user = state.accounts.register(form).await?;
    let (jar, body) = start_session(&state, jar, user)?;
    Ok((StatusCode::CREATED, jar, body))
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(form): Json<LoginForm>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let user = state
        .accounts
        .verify_credential(&form.username, &form.password)
        .await?;
    start_session(&state, jar, user)
}

/// Logout - drop the session cookie. Tokens are stateless, so a copied
/// bearer token stays valid until it expires.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.remove(removal_cookie(&state.config)),
        StatusCode::NO_CONTENT,
    )
}
