// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Badge award ledger entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::badges::BadgeRule;

/// Append-only record of a badge being earned.
///
/// Stored at `badge_awards/{user_id}_{slug}`, so each (user, badge) pair has
/// exactly one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeAward {
    pub user_id: String,
    pub badge_name: String,
    pub badge_description: String,
    pub awarded_at: DateTime<Utc>,
}

impl BadgeAward {
    pub fn new(user_id: &str, rule: &BadgeRule, awarded_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            badge_name: rule.name.to_string(),
            badge_description: rule.description.to_string(),
            awarded_at,
        }
    }

    /// Document ID for this award.
    pub fn document_id(&self) -> String {
        let slug = crate::services::badges::find_badge(&self.badge_name)
            .map(|rule| rule.slug.to_string())
            .unwrap_or_else(|| self.badge_name.to_lowercase().replace(' ', "-"));
        format!("{}_{}", self.user_id, slug)
    }
}
