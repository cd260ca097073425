// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! API routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::user::LearningPreferences;
use crate::models::{BadgeAward, CheckIn, User};
use crate::services::accounts::PreferencesForm;
use crate::services::badges::BADGE_CATALOG;
use crate::services::checkin::{CheckinForm, CheckinOutcome, Dashboard};
use crate::services::streak::StreakStatus;
use crate::services::weather::Weather;
use crate::time_utils::{format_utc_rfc3339, utc_today};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_HISTORY_LIMIT: u32 = 30;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/checkins", post(submit_checkin).get(get_checkins))
        .route("/api/badges", get(get_badges))
        .route("/api/preferences", put(update_preferences))
        .route("/api/progress/reconcile", post(reconcile_progress))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response. Never includes the password hash.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
    pub streak_count: u32,
    /// YYYY-MM-DD
    pub last_checkin: Option<String>,
    pub badges: Vec<String>,
    /// Minutes
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_study_time: u64,
    pub study_groups: Vec<String>,
    pub learning_preferences: LearningPreferences,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: format_utc_rfc3339(user.created_at),
            streak_count: user.streak_count,
            last_checkin: user.last_checkin.map(|d| d.to_string()),
            badges: user.badges,
            total_study_time: user.total_study_time,
            study_groups: user.study_groups,
            learning_preferences: user.learning_preferences,
        }
    }
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state.accounts.get_user(&user.user_id).await?;
    Ok(Json(profile.into()))
}

/// Replace the user's learning preferences.
async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(form): Json<PreferencesForm>,
) -> Result<Json<UserResponse>> {
    let updated = state
        .accounts
        .update_preferences(&user.user_id, form)
        .await?;
    Ok(Json(updated.into()))
}

// ─── Check-ins ───────────────────────────────────────────────

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckinSummary {
    /// YYYY-MM-DD
    pub date: String,
    pub study_time: u32,
    pub subjects: Vec<String>,
    pub notes: String,
    pub timestamp: String,
}

impl From<CheckIn> for CheckinSummary {
    fn from(checkin: CheckIn) -> Self {
        Self {
            date: checkin.date.to_string(),
            study_time: checkin.study_time,
            subjects: checkin.subjects,
            notes: checkin.notes,
            timestamp: format_utc_rfc3339(checkin.timestamp),
        }
    }
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckinResponse {
    pub success: bool,
    pub message: String,
    pub streak_count: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_study_time: u64,
    pub new_badges: Vec<String>,
    pub checkin: CheckinSummary,
}

impl From<CheckinOutcome> for CheckinResponse {
    fn from(outcome: CheckinOutcome) -> Self {
        Self {
            success: true,
            message: outcome.message,
            streak_count: outcome.streak_count,
            total_study_time: outcome.total_study_time,
            new_badges: outcome.new_badges,
            checkin: outcome.checkin.into(),
        }
    }
}

/// Record today's (UTC) check-in.
async fn submit_checkin(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(form): Json<CheckinForm>,
) -> Result<Json<CheckinResponse>> {
    let outcome = state
        .checkins
        .submit_checkin(&user.user_id, utc_today(), form)
        .await?;
    Ok(Json(outcome.into()))
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_HISTORY_LIMIT
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckinHistoryResponse {
    pub checkins: Vec<CheckinSummary>,
}

/// Check-in history, newest first.
async fn get_checkins(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<CheckinHistoryResponse>> {
    let checkins = state
        .checkins
        .checkin_history(&user.user_id, query.limit)
        .await?;
    Ok(Json(CheckinHistoryResponse {
        checkins: checkins.into_iter().map(Into::into).collect(),
    }))
}

// ─── Dashboard ───────────────────────────────────────────────

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DashboardResponse {
    pub user: UserResponse,
    pub streak_status: StreakStatus,
    pub recent_checkins: Vec<CheckinSummary>,
    pub weather: Weather,
}

impl From<Dashboard> for DashboardResponse {
    fn from(dashboard: Dashboard) -> Self {
        Self {
            user: dashboard.user.into(),
            streak_status: dashboard.streak_status,
            recent_checkins: dashboard
                .recent_checkins
                .into_iter()
                .map(Into::into)
                .collect(),
            weather: dashboard.weather,
        }
    }
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DashboardResponse>> {
    let dashboard = state.checkins.dashboard(&user.user_id, utc_today()).await?;
    Ok(Json(dashboard.into()))
}

// ─── Badges ──────────────────────────────────────────────────

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EarnedBadge {
    pub name: String,
    pub description: String,
    pub awarded_at: String,
}

impl From<BadgeAward> for EarnedBadge {
    fn from(award: BadgeAward) -> Self {
        Self {
            name: award.badge_name,
            description: award.badge_description,
            awarded_at: format_utc_rfc3339(award.awarded_at),
        }
    }
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CatalogBadge {
    pub name: String,
    pub description: String,
    pub held: bool,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BadgesResponse {
    /// Award ledger, oldest first
    pub earned: Vec<EarnedBadge>,
    /// Every badge, flagged with whether the user holds it
    pub catalog: Vec<CatalogBadge>,
}

fn catalog_for(user: &User) -> Vec<CatalogBadge> {
    BADGE_CATALOG
        .iter()
        .map(|rule| CatalogBadge {
            name: rule.name.to_string(),
            description: rule.description.to_string(),
            held: user.has_badge(rule.name),
        })
        .collect()
}

async fn get_badges(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<BadgesResponse>> {
    let profile = state.accounts.get_user(&user.user_id).await?;
    let ledger = state.checkins.badge_ledger(&user.user_id).await?;

    Ok(Json(BadgesResponse {
        earned: ledger.into_iter().map(Into::into).collect(),
        catalog: catalog_for(&profile),
    }))
}

// ─── Maintenance ─────────────────────────────────────────────

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReconcileResponse {
    pub repaired: bool,
    pub streak_count: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_study_time: u64,
    pub new_badges: Vec<String>,
}

/// Rebuild the cached streak from the check-in history.
async fn reconcile_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ReconcileResponse>> {
    let outcome = state.checkins.reconcile_progress(&user.user_id).await?;
    Ok(Json(ReconcileResponse {
        repaired: outcome.repaired,
        streak_count: outcome.user.streak_count,
        total_study_time: outcome.user.total_study_time,
        new_badges: outcome.new_badges,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn user() -> User {
        let mut user = User::new(
            "u1".to_string(),
            "ada".to_string(),
            "ada@example.com".to_string(),
            "pbkdf2-sha256$1000$salt$hash".to_string(),
        );
        user.created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        user.last_checkin = NaiveDate::from_ymd_opt(2024, 3, 9);
        user
    }

    #[test]
    fn test_user_response_hides_password_hash() {
        let json = serde_json::to_value(UserResponse::from(user())).unwrap();

        assert!(json.get("password_hash").is_none());
        assert_eq!(json["last_checkin"], "2024-03-09");
        assert_eq!(json["created_at"], "2024-03-01T12:00:00Z");
        assert_eq!(
            json["learning_preferences"]["study_time_preference"],
            "morning"
        );
    }

    #[test]
    fn test_catalog_flags_held_badges() {
        let mut u = user();
        u.badges = vec!["First Step".to_string(), "Week Warrior".to_string()];

        let catalog = catalog_for(&u);
        assert_eq!(catalog.len(), BADGE_CATALOG.len());
        let held: Vec<&str> = catalog
            .iter()
            .filter(|b| b.held)
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(held, vec!["First Step", "Week Warrior"]);
    }
}
