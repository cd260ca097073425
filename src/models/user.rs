// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! User model for storage and API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::services::streak::Progress;

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID (also used as document ID)
    pub id: String,
    /// Unique login name
    pub username: String,
    /// Unique email address, stored lower-cased
    pub email: String,
    /// PBKDF2 password hash (see `services::password`)
    pub password_hash: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// Consecutive-day streak as of `last_checkin`
    #[serde(default)]
    pub streak_count: u32,
    /// Date of the most recent check-in (UTC calendar date)
    #[serde(default)]
    pub last_checkin: Option<NaiveDate>,
    /// Names of badges earned, in award order
    #[serde(default)]
    pub badges: Vec<String>,
    /// Cumulative study time in minutes
    #[serde(default)]
    pub total_study_time: u64,
    #[serde(default)]
    pub study_groups: Vec<String>,
    #[serde(default)]
    pub learning_preferences: LearningPreferences,
}

impl User {
    /// Fresh account with an empty streak and no badges.
    pub fn new(id: String, username: String, email: String, password_hash: String) -> Self {
        Self {
            id,
            username,
            email,
            password_hash,
            created_at: Utc::now(),
            streak_count: 0,
            last_checkin: None,
            badges: Vec::new(),
            total_study_time: 0,
            study_groups: Vec::new(),
            learning_preferences: LearningPreferences::default(),
        }
    }

    /// Immutable snapshot of the streak projection.
    pub fn progress(&self) -> Progress {
        Progress {
            streak_count: self.streak_count,
            total_study_time: self.total_study_time,
            last_checkin: self.last_checkin,
        }
    }

    /// Overwrite the streak projection from a computed snapshot.
    pub fn apply_progress(&mut self, progress: Progress) {
        self.streak_count = progress.streak_count;
        self.total_study_time = progress.total_study_time;
        self.last_checkin = progress.last_checkin;
    }

    pub fn has_badge(&self, name: &str) -> bool {
        self.badges.iter().any(|b| b == name)
    }
}

/// Preferred time of day for studying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum StudyTimePreference {
    #[default]
    Morning,
    Afternoon,
    Evening,
    Night,
}

/// How much the user wants to study with others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum CollaborationLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Opaque-to-the-core learning configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LearningPreferences {
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub study_time_preference: StudyTimePreference,
    #[serde(default)]
    pub collaboration_level: CollaborationLevel,
}
