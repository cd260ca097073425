// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! In-process store.
//!
//! All collections sit behind one `RwLock`, so every [`Commit`] is applied
//! under a single write guard and is trivially atomic. Each user carries a
//! counter that every user write bumps, standing in for Firestore's update
//! time.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::db::{Commit, Revision, Store};
use crate::error::AppError;
use crate::models::{BadgeAward, CheckIn, LearningPreferences, User};

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    /// user ID -> write counter
    revisions: HashMap<String, i64>,
    /// username -> user ID
    usernames: HashMap<String, String>,
    /// lower-cased email -> user ID
    emails: HashMap<String, String>,
    /// Ordered by (user, date) so range scans give per-user history.
    checkins: BTreeMap<(String, NaiveDate), CheckIn>,
    badge_awards: Vec<BadgeAward>,
}

/// Memory-backed [`Store`]. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collections {
    fn bump_revision(&mut self, user_id: &str) {
        *self.revisions.entry(user_id.to_string()).or_insert(0) += 1;
    }
}

fn user_range(user_id: &str) -> std::ops::RangeInclusive<(String, NaiveDate)> {
    (user_id.to_string(), NaiveDate::MIN)..=(user_id.to_string(), NaiveDate::MAX)
}

#[async_trait]
impl Store for MemoryDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.users.get(user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let data = self.inner.read().await;
        Ok(data
            .usernames
            .get(username)
            .and_then(|id| data.users.get(id))
            .cloned())
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let mut data = self.inner.write().await;
        let email = user.email.to_lowercase();

        if data.users.contains_key(&user.id)
            || data.usernames.contains_key(&user.username)
            || data.emails.contains_key(&email)
        {
            return Err(AppError::DuplicateUser);
        }

        data.usernames.insert(user.username.clone(), user.id.clone());
        data.emails.insert(email, user.id.clone());
        data.users.insert(user.id.clone(), user.clone());
        data.bump_revision(&user.id);
        Ok(())
    }

    async fn get_user_for_update(
        &self,
        user_id: &str,
    ) -> Result<Option<(User, Revision)>, AppError> {
        let data = self.inner.read().await;
        Ok(data.users.get(user_id).map(|user| {
            let revision = data.revisions.get(user_id).copied().unwrap_or(0);
            (user.clone(), Revision(revision))
        }))
    }

    async fn set_learning_preferences(
        &self,
        user_id: &str,
        preferences: &LearningPreferences,
    ) -> Result<(), AppError> {
        let mut data = self.inner.write().await;
        match data.users.get_mut(user_id) {
            Some(user) => user.learning_preferences = preferences.clone(),
            None => return Err(AppError::NotFound(format!("User {} not found", user_id))),
        }
        data.bump_revision(user_id);
        Ok(())
    }

    async fn get_checkin(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<CheckIn>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .checkins
            .get(&(user_id.to_string(), date))
            .cloned())
    }

    async fn recent_checkins(&self, user_id: &str, limit: u32) -> Result<Vec<CheckIn>, AppError> {
        let data = self.inner.read().await;
        Ok(data
            .checkins
            .range(user_range(user_id))
            .rev()
            .take(limit as usize)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn all_checkins(&self, user_id: &str) -> Result<Vec<CheckIn>, AppError> {
        let data = self.inner.read().await;
        Ok(data
            .checkins
            .range(user_range(user_id))
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn badge_awards(&self, user_id: &str) -> Result<Vec<BadgeAward>, AppError> {
        let data = self.inner.read().await;
        Ok(data
            .badge_awards
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn commit(&self, commit: &Commit) -> Result<(), AppError> {
        let mut data = self.inner.write().await;
        let user_id = &commit.user.id;

        // Validate everything before the first write.
        if !data.users.contains_key(user_id) {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        if let Some(checkin) = &commit.checkin {
            if data
                .checkins
                .contains_key(&(checkin.user_id.clone(), checkin.date))
            {
                return Err(AppError::DuplicateCheckin);
            }
        }
        let current = data.revisions.get(user_id).copied().unwrap_or(0);
        if Revision(current) != commit.revision {
            tracing::info!(user_id = %user_id, "User changed since read, rejecting commit");
            return Err(AppError::ConcurrentUpdate);
        }
        let duplicate_award = commit.awards.iter().any(|award| {
            data.badge_awards
                .iter()
                .any(|a| a.user_id == award.user_id && a.badge_name == award.badge_name)
        });
        if duplicate_award {
            return Err(AppError::Database(format!(
                "Badge already recorded for user {}",
                user_id
            )));
        }

        if let Some(checkin) = &commit.checkin {
            data.checkins
                .insert((checkin.user_id.clone(), checkin.date), checkin.clone());
        }
        data.badge_awards.extend(commit.awards.iter().cloned());
        data.users.insert(user_id.clone(), commit.user.clone());
        data.bump_revision(user_id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str, username: &str, email: &str) -> User {
        User::new(
            id.to_string(),
            username.to_string(),
            email.to_string(),
            "hash".to_string(),
        )
    }

    fn checkin(user_id: &str, date: NaiveDate) -> CheckIn {
        CheckIn {
            user_id: user_id.to_string(),
            date,
            study_time: 10,
            subjects: vec![],
            notes: String::new(),
            timestamp: Utc::now(),
        }
    }

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, n).unwrap()
    }

    #[tokio::test]
    async fn test_create_user_enforces_uniqueness() {
        let db = MemoryDb::new();
        db.create_user(&user("1", "ada", "ada@example.com"))
            .await
            .unwrap();

        let same_name = db.create_user(&user("2", "ada", "other@example.com")).await;
        assert!(matches!(same_name, Err(AppError::DuplicateUser)));

        let same_email = db.create_user(&user("3", "bob", "ADA@example.com")).await;
        assert!(matches!(same_email, Err(AppError::DuplicateUser)));

        let found = db.find_user_by_username("ada").await.unwrap().unwrap();
        assert_eq!(found.id, "1");
    }

    #[tokio::test]
    async fn test_commit_rejects_duplicate_checkin_without_writing() {
        let db = MemoryDb::new();
        let mut u = user("1", "ada", "ada@example.com");
        db.create_user(&u).await.unwrap();

        let (_, revision) = db.get_user_for_update("1").await.unwrap().unwrap();
        u.streak_count = 1;
        db.commit(&Commit {
            user: u.clone(),
            revision,
            checkin: Some(checkin("1", day(3))),
            awards: vec![],
        })
        .await
        .unwrap();

        let (mut changed, revision) = db.get_user_for_update("1").await.unwrap().unwrap();
        changed.streak_count = 99;
        let result = db
            .commit(&Commit {
                user: changed,
                revision,
                checkin: Some(checkin("1", day(3))),
                awards: vec![],
            })
            .await;

        assert!(matches!(result, Err(AppError::DuplicateCheckin)));
        assert_eq!(db.get_user("1").await.unwrap().unwrap().streak_count, 1);
    }

    #[tokio::test]
    async fn test_checkin_queries_are_per_user_and_ordered() {
        let db = MemoryDb::new();
        for (id, name) in [("a", "alice"), ("b", "bob")] {
            db.create_user(&user(id, name, &format!("{name}@example.com")))
                .await
                .unwrap();
        }
        for (user_id, d) in [("a", 1), ("b", 2), ("a", 3), ("a", 2)] {
            let (u, revision) = db.get_user_for_update(user_id).await.unwrap().unwrap();
            db.commit(&Commit {
                user: u,
                revision,
                checkin: Some(checkin(user_id, day(d))),
                awards: vec![],
            })
            .await
            .unwrap();
        }

        let recent = db.recent_checkins("a", 2).await.unwrap();
        assert_eq!(
            recent.iter().map(|c| c.date).collect::<Vec<_>>(),
            vec![day(3), day(2)]
        );

        let all = db.all_checkins("a").await.unwrap();
        assert_eq!(
            all.iter().map(|c| c.date).collect::<Vec<_>>(),
            vec![day(1), day(2), day(3)]
        );
        assert_eq!(db.all_checkins("b").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_rejects_stale_revision() {
        let db = MemoryDb::new();
        db.create_user(&user("1", "ada", "ada@example.com"))
            .await
            .unwrap();
        let (mut stale, revision) = db.get_user_for_update("1").await.unwrap().unwrap();

        let prefs = LearningPreferences {
            subjects: vec!["rust".to_string()],
            ..LearningPreferences::default()
        };
        db.set_learning_preferences("1", &prefs).await.unwrap();

        stale.streak_count = 5;
        let result = db
            .commit(&Commit {
                user: stale,
                revision,
                checkin: Some(checkin("1", day(3))),
                awards: vec![],
            })
            .await;

        assert!(matches!(result, Err(AppError::ConcurrentUpdate)));
        let stored = db.get_user("1").await.unwrap().unwrap();
        assert_eq!(stored.streak_count, 0);
        assert_eq!(stored.learning_preferences, prefs);
        assert!(db.get_checkin("1", day(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_learning_preferences_keeps_progress() {
        let db = MemoryDb::new();
        db.create_user(&user("1", "ada", "ada@example.com"))
            .await
            .unwrap();
        let (mut u, revision) = db.get_user_for_update("1").await.unwrap().unwrap();
        u.streak_count = 3;
        u.total_study_time = 45;
        db.commit(&Commit {
            user: u,
            revision,
            checkin: Some(checkin("1", day(3))),
            awards: vec![],
        })
        .await
        .unwrap();

        let prefs = LearningPreferences {
            subjects: vec!["math".to_string()],
            ..LearningPreferences::default()
        };
        db.set_learning_preferences("1", &prefs).await.unwrap();

        let stored = db.get_user("1").await.unwrap().unwrap();
        assert_eq!(stored.streak_count, 3);
        assert_eq!(stored.total_study_time, 45);
        assert_eq!(stored.learning_preferences, prefs);

        let missing = db.set_learning_preferences("nobody", &prefs).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
