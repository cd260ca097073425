// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Badge catalog and evaluation.
//!
//! Badges are one-time awards. The catalog is a static table of pure
//! predicates over a [`Progress`] snapshot; persistence of new awards is the
//! check-in service's job.

use crate::services::streak::Progress;

/// A badge and the condition that earns it.
pub struct BadgeRule {
    /// Display name, also stored in `User.badges`
    pub name: &'static str,
    /// Stable identifier used in ledger document IDs
    pub slug: &'static str,
    pub description: &'static str,
    qualifies: fn(&Progress) -> bool,
}

impl std::fmt::Debug for BadgeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BadgeRule")
            .field("name", &self.name)
            .field("slug", &self.slug)
            .finish_non_exhaustive()
    }
}

impl BadgeRule {
    pub fn qualifies(&self, progress: &Progress) -> bool {
        (self.qualifies)(progress)
    }
}

/// All badges, in evaluation order.
pub static BADGE_CATALOG: [BadgeRule; 5] = [
    BadgeRule {
        name: "First Step",
        slug: "first-step",
        description: "Complete your first check-in",
        qualifies: |p| p.streak_count >= 1,
    },
    BadgeRule {
        name: "Week Warrior",
        slug: "week-warrior",
        description: "7-day study streak",
        qualifies: |p| p.streak_count >= 7,
    },
    BadgeRule {
        name: "Month Master",
        slug: "month-master",
        description: "30-day study streak",
        qualifies: |p| p.streak_count >= 30,
    },
    BadgeRule {
        name: "Century Scholar",
        slug: "century-scholar",
        description: "100 hours of total study time",
        // 100 minutes, not hours. The wording is stored in existing ledgers.
        qualifies: |p| p.total_study_time >= 100,
    },
    BadgeRule {
        name: "Dedication Diamond",
        slug: "dedication-diamond",
        description: "50-day study streak",
        qualifies: |p| p.streak_count >= 50,
    },
];

/// Look up a catalog entry by display name.
pub fn find_badge(name: &str) -> Option<&'static BadgeRule> {
    BADGE_CATALOG.iter().find(|rule| rule.name == name)
}

/// Badges that `progress` qualifies for and that are not in `held`.
///
/// Returns every newly qualifying badge, in catalog order.
pub fn evaluate_badges<S: AsRef<str>>(progress: &Progress, held: &[S]) -> Vec<&'static BadgeRule> {
    BADGE_CATALOG
        .iter()
        .filter(|rule| !held.iter().any(|h| h.as_ref() == rule.name))
        .filter(|rule| rule.qualifies(progress))
        .collect()
}
