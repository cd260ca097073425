// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Check-in orchestration.
//!
//! A check-in is: reject duplicates for the day, record the check-in,
//! advance the streak projection, award any newly earned badges. The last
//! three steps go to the store as one [`Commit`], and the whole sequence
//! runs under a per-user lock so two submissions from the same user (double
//! clicks, retries, several tabs) cannot interleave. The commit carries the
//! revision the user was read at; a write from another instance in between
//! fails it with `ConcurrentUpdate`.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::db::{Commit, Revision, Store};
use crate::error::{AppError, Result};
use crate::models::{BadgeAward, CheckIn, User};
use crate::services::accounts::{normalize_subjects, validate_subjects};
use crate::services::badges::{evaluate_badges, BadgeRule};
use crate::services::locks::UserLocks;
use crate::services::streak::{self, compute_streak_status, StreakStatus};
use crate::services::weather::{compute_weather, Weather};

/// Maximum study time for a single day, in minutes.
pub const MAX_STUDY_MINUTES: u32 = 24 * 60;

/// Number of check-ins shown on the dashboard.
pub const DASHBOARD_RECENT_CHECKINS: u32 = 7;

/// Upper bound for history queries.
pub const MAX_HISTORY_LIMIT: u32 = 100;

const CHECKIN_SUCCESS_MESSAGE: &str = "Daily check-in completed! Keep up the great work!";

/// Check-in submission.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CheckinForm {
    /// Minutes studied today
    #[serde(default)]
    #[validate(range(max = 1440))]
    pub study_time: u32,
    #[serde(default)]
    #[validate(custom(function = "validate_subjects"))]
    pub subjects: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: String,
}

/// Result of a successful check-in.
#[derive(Debug, Clone)]
pub struct CheckinOutcome {
    pub message: String,
    pub checkin: CheckIn,
    pub streak_count: u32,
    pub total_study_time: u64,
    /// Badges earned by this check-in, in catalog order
    pub new_badges: Vec<String>,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub user: User,
    pub streak_status: StreakStatus,
    pub recent_checkins: Vec<CheckIn>,
    pub weather: Weather,
}

/// Result of replaying a user's history against the cached projection.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Whether the cached projection disagreed with the history
    pub repaired: bool,
    pub user: User,
    pub new_badges: Vec<String>,
}

/// Orchestrates streaks, badges and check-in persistence.
#[derive(Clone)]
pub struct CheckinService {
    db: Arc<dyn Store>,
    /// Per-user mutex serializing check-in work.
    locks: UserLocks,
}

impl CheckinService {
    pub fn new(db: Arc<dyn Store>, locks: UserLocks) -> Self {
        Self { db, locks }
    }

    fn not_found(user_id: &str) -> AppError {
        AppError::NotFound(format!("User {} not found", user_id))
    }

    async fn load_user(&self, user_id: &str) -> Result<User> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| Self::not_found(user_id))
    }

    async fn load_for_update(&self, user_id: &str) -> Result<(User, Revision)> {
        self.db
            .get_user_for_update(user_id)
            .await?
            .ok_or_else(|| Self::not_found(user_id))
    }

    /// Record today's check-in for `user_id`.
    ///
    /// Fails with `DuplicateCheckin` (and changes nothing) if the user has
    /// already checked in on `date`.
    pub async fn submit_checkin(
        &self,
        user_id: &str,
        date: NaiveDate,
        form: CheckinForm,
    ) -> Result<CheckinOutcome> {
        form.validate()?;

        let _guard = self.locks.acquire(user_id).await;

        let (mut user, revision) = self.load_for_update(user_id).await?;

        if self.db.get_checkin(user_id, date).await?.is_some() {
            tracing::info!(user_id, %date, "Duplicate check-in rejected");
            return Err(AppError::DuplicateCheckin);
        }

        let now = Utc::now();
        let checkin = CheckIn {
            user_id: user_id.to_string(),
            date,
            study_time: form.study_time,
            subjects: normalize_subjects(form.subjects),
            notes: form.notes,
            timestamp: now,
        };

        let progress = streak::apply_checkin(user.progress(), date, form.study_time);
        user.apply_progress(progress);

        let earned = evaluate_badges(&progress, &user.badges);
        let awards = grant(&mut user, &earned, now);

        self.db
            .commit(&Commit {
                user: user.clone(),
                revision,
                checkin: Some(checkin.clone()),
                awards,
            })
            .await?;

        let new_badges = badge_names(&earned);

        tracing::info!(
            user_id,
            %date,
            study_time = checkin.study_time,
            streak = user.streak_count,
            total_study_time = user.total_study_time,
            new_badges = ?new_badges,
            "Check-in recorded"
        );

        Ok(CheckinOutcome {
            message: CHECKIN_SUCCESS_MESSAGE.to_string(),
            checkin,
            streak_count: user.streak_count,
            total_study_time: user.total_study_time,
            new_badges,
        })
    }

    /// Award any badges the user qualifies for but does not hold.
    ///
    /// Returns the names of newly awarded badges; empty when nothing
    /// changed, so repeated calls are harmless.
    pub async fn evaluate_badges(&self, user_id: &str) -> Result<Vec<String>> {
        let _guard = self.locks.acquire(user_id).await;

        let (mut user, revision) = self.load_for_update(user_id).await?;
        let earned = evaluate_badges(&user.progress(), &user.badges);
        if earned.is_empty() {
            return Ok(Vec::new());
        }

        let awards = grant(&mut user, &earned, Utc::now());
        self.db
            .commit(&Commit {
                user: user.clone(),
                revision,
                checkin: None,
                awards,
            })
            .await?;

        let names = badge_names(&earned);
        tracing::info!(user_id, badges = ?names, "Badges awarded");
        Ok(names)
    }

    /// Dashboard data as of `today`.
    pub async fn dashboard(&self, user_id: &str, today: NaiveDate) -> Result<Dashboard> {
        let user = self.load_user(user_id).await?;
        let recent_checkins = self
            .db
            .recent_checkins(user_id, DASHBOARD_RECENT_CHECKINS)
            .await?;

        let streak_status = compute_streak_status(user.last_checkin, user.streak_count, today);
        let weather = compute_weather(user.streak_count, user.total_study_time);

        Ok(Dashboard {
            user,
            streak_status,
            recent_checkins,
            weather,
        })
    }

    /// Most recent check-ins, newest first. `limit` is clamped to 1..=100.
    pub async fn checkin_history(&self, user_id: &str, limit: u32) -> Result<Vec<CheckIn>> {
        self.load_user(user_id).await?;
        self.db
            .recent_checkins(user_id, limit.clamp(1, MAX_HISTORY_LIMIT))
            .await
    }

    pub async fn badge_ledger(&self, user_id: &str) -> Result<Vec<BadgeAward>> {
        self.db.badge_awards(user_id).await
    }

    /// Rebuild the cached streak projection from the check-in history.
    ///
    /// Badges are never revoked; any the rebuilt projection newly qualifies
    /// for are awarded. The repair and the awards land in one commit.
    pub async fn reconcile_progress(&self, user_id: &str) -> Result<ReconcileOutcome> {
        let _guard = self.locks.acquire(user_id).await;

        let (mut user, revision) = self.load_for_update(user_id).await?;
        let history = self.db.all_checkins(user_id).await?;
        let replayed = streak::replay(history.iter().map(|c| (c.date, c.study_time)));

        let repaired = replayed != user.progress();
        if repaired {
            tracing::warn!(
                user_id,
                cached_streak = user.streak_count,
                replayed_streak = replayed.streak_count,
                cached_total = user.total_study_time,
                replayed_total = replayed.total_study_time,
                "Cached progress out of sync with history, repairing"
            );
            user.apply_progress(replayed);
        }

        let earned = evaluate_badges(&user.progress(), &user.badges);
        let awards = grant(&mut user, &earned, Utc::now());

        if repaired || !awards.is_empty() {
            self.db
                .commit(&Commit {
                    user: user.clone(),
                    revision,
                    checkin: None,
                    awards,
                })
                .await?;
        }

        let new_badges = badge_names(&earned);
        if !new_badges.is_empty() {
            tracing::info!(user_id, badges = ?new_badges, "Badges awarded");
        }

        Ok(ReconcileOutcome {
            repaired,
            user,
            new_badges,
        })
    }
}

/// Add `earned` to the user's badge set and build matching ledger entries.
fn grant(user: &mut User, earned: &[&BadgeRule], now: chrono::DateTime<Utc>) -> Vec<BadgeAward> {
    earned
        .iter()
        .map(|rule| {
            user.badges.push(rule.name.to_string());
            BadgeAward::new(&user.id, rule, now)
        })
        .collect()
}

fn badge_names(earned: &[&BadgeRule]) -> Vec<String> {
    earned.iter().map(|r| r.name.to_string()).collect()
}
