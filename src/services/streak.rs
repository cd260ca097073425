// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Streak engine.
//!
//! Pure transition functions over a user's cached progress. The cached
//! values on the user document are a projection of the check-in history;
//! [`replay`] rebuilds that projection from scratch.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::time_utils::days_between;

/// Snapshot of the streak projection for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub streak_count: u32,
    pub total_study_time: u64,
    pub last_checkin: Option<NaiveDate>,
}

/// Where the user stands relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum StreakState {
    NotStarted,
    CheckedInToday,
    ReadyToContinue,
    Broken,
}

impl StreakState {
    pub fn message(self) -> &'static str {
        match self {
            StreakState::NotStarted => "Start your streak today!",
            StreakState::CheckedInToday => "Already checked in today!",
            StreakState::ReadyToContinue => "Ready to continue your streak!",
            StreakState::Broken => "Streak broken. Start fresh today!",
        }
    }
}

/// Dashboard view of the streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StreakStatus {
    pub current_streak: u32,
    pub can_checkin: bool,
    pub state: StreakState,
    pub status: String,
}

impl StreakStatus {
    fn new(current_streak: u32, can_checkin: bool, state: StreakState) -> Self {
        Self {
            current_streak,
            can_checkin,
            state,
            status: state.message().to_string(),
        }
    }
}

/// Streak status as seen on `today`.
///
/// A broken streak reads as 0 even though the stored count is untouched
/// until the next check-in.
pub fn compute_streak_status(
    last_checkin: Option<NaiveDate>,
    current_streak: u32,
    today: NaiveDate,
) -> StreakStatus {
    let Some(last) = last_checkin else {
        return StreakStatus::new(0, true, StreakState::NotStarted);
    };

    match days_between(last, today) {
        0 => StreakStatus::new(current_streak, false, StreakState::CheckedInToday),
        1 => StreakStatus::new(current_streak, true, StreakState::ReadyToContinue),
        // Gaps of more than a day and negative gaps (clock moved backwards)
        _ => StreakStatus::new(0, true, StreakState::Broken),
    }
}

/// Progress after a check-in on `today` worth `study_time` minutes.
///
/// Not idempotent: callers must reject a second check-in for the same date
/// before calling this.
pub fn apply_checkin(progress: Progress, today: NaiveDate, study_time: u32) -> Progress {
    let streak_count = match progress.last_checkin {
        Some(last) if days_between(last, today) == 1 => progress.streak_count.saturating_add(1),
        _ => 1,
    };

    Progress {
        streak_count,
        total_study_time: progress
            .total_study_time
            .saturating_add(u64::from(study_time)),
        last_checkin: Some(today),
    }
}

/// Rebuild progress from a check-in history of `(date, study_time)` pairs.
///
/// Input order does not matter. Duplicate dates should not exist; if they
/// do, each one still counts toward study time but only once toward the
/// streak.
pub fn replay<I>(history: I) -> Progress
where
    I: IntoIterator<Item = (NaiveDate, u32)>,
{
    let mut entries: Vec<(NaiveDate, u32)> = history.into_iter().collect();
    entries.sort_by_key(|(date, _)| *date);

    entries
        .into_iter()
        .fold(Progress::default(), |progress, (date, study_time)| {
            if progress.last_checkin == Some(date) {
                Progress {
                    total_study_time: progress
                        .total_study_time
                        .saturating_add(u64::from(study_time)),
                    ..progress
                }
            } else {
                apply_checkin(progress, date, study_time)
            }
        })
}
