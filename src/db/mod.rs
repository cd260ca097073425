// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Database layer.
//!
//! [`Store`] is the persistence port used by the services. Two adapters
//! implement it: [`FirestoreDb`] for deployments and [`MemoryDb`] for local
//! development and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{BadgeAward, CheckIn, LearningPreferences, User};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Username reservations (document ID = username)
    pub const USERNAMES: &str = "usernames";
    /// Email reservations (document ID = lower-cased email)
    pub const EMAILS: &str = "emails";
    /// Check-ins keyed `{user_id}_{date}`
    pub const CHECKINS: &str = "checkins";
    /// Badge ledger keyed `{user_id}_{slug}`
    pub const BADGE_AWARDS: &str = "badge_awards";
}

/// Version stamp of a stored user document.
///
/// Changes on every write to the user. Firestore uses the document's
/// update time in microseconds, the memory store a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision(pub(crate) i64);

/// A set of writes that must land together or not at all.
#[derive(Debug, Clone)]
pub struct Commit {
    /// Full replacement for the user document.
    pub user: User,
    /// Revision `user` was read at. The commit fails with
    /// `ConcurrentUpdate` if the stored document has moved on.
    pub revision: Revision,
    /// New check-in; the commit fails with `DuplicateCheckin` if one
    /// already exists for the same (user, date).
    pub checkin: Option<CheckIn>,
    /// New ledger entries. Their names must already be in `user.badges`.
    pub awards: Vec<BadgeAward>,
}

/// Persistence operations the services need.
#[async_trait]
pub trait Store: Send + Sync {
    /// Load a user by ID.
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    /// Load a user by username.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Insert a new user. Fails with `DuplicateUser` if the username or
    /// email is taken.
    async fn create_user(&self, user: &User) -> Result<(), AppError>;

    /// Load a user together with the revision a [`Commit`] must match.
    async fn get_user_for_update(&self, user_id: &str)
        -> Result<Option<(User, Revision)>, AppError>;

    /// Replace only `learning_preferences` on an existing user, leaving the
    /// streak projection untouched.
    async fn set_learning_preferences(
        &self,
        user_id: &str,
        preferences: &LearningPreferences,
    ) -> Result<(), AppError>;

    /// The check-in for (user, date), if any.
    async fn get_checkin(&self, user_id: &str, date: NaiveDate)
        -> Result<Option<CheckIn>, AppError>;

    /// Most recent check-ins, newest first.
    async fn recent_checkins(&self, user_id: &str, limit: u32) -> Result<Vec<CheckIn>, AppError>;

    /// Full check-in history, oldest first.
    async fn all_checkins(&self, user_id: &str) -> Result<Vec<CheckIn>, AppError>;

    /// Badge ledger for a user, in award order.
    async fn badge_awards(&self, user_id: &str) -> Result<Vec<BadgeAward>, AppError>;

    /// Apply a [`Commit`] atomically.
    async fn commit(&self, commit: &Commit) -> Result<(), AppError>;
}
