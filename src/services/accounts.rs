// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Account registration, credential checks and profile updates.

use std::sync::Arc;

use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::user::{CollaborationLevel, StudyTimePreference};
use crate::models::{LearningPreferences, User};
use crate::services::locks::UserLocks;
use crate::services::password::PasswordHasher;

const MAX_SUBJECTS: usize = 20;
const MAX_SUBJECT_LEN: usize = 64;

/// Registration input.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(length(min = 3, max = 32), custom(function = "validate_username"))]
    pub username: String,
    #[validate(email, length(max = 254))]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Learning preferences update.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PreferencesForm {
    #[serde(default)]
    #[validate(custom(function = "validate_subjects"))]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub study_time_preference: StudyTimePreference,
    #[serde(default)]
    pub collaboration_level: CollaborationLevel,
}

fn validate_username(username: &str) -> std::result::Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_chars"))
    }
}

/// Subject lists: at most 20 entries, each 1-64 characters after trimming.
pub(crate) fn validate_subjects(subjects: &[String]) -> std::result::Result<(), ValidationError> {
    if subjects.len() > MAX_SUBJECTS {
        return Err(ValidationError::new("too_many_subjects"));
    }
    let bad = subjects.iter().any(|s| {
        let len = s.trim().chars().count();
        len == 0 || len > MAX_SUBJECT_LEN
    });
    if bad {
        return Err(ValidationError::new("subject_length"));
    }
    Ok(())
}

/// Trim and deduplicate subjects, keeping first-seen order.
pub(crate) fn normalize_subjects(subjects: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(subjects.len());
    for subject in subjects {
        let subject = subject.trim().to_string();
        if !out.contains(&subject) {
            out.push(subject);
        }
    }
    out
}

/// Account operations over the user collections.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<dyn Store>,
    hasher: PasswordHasher,
    locks: UserLocks,
}

impl AccountService {
    /// `locks` must be the same map the check-in service holds.
    pub fn new(db: Arc<dyn Store>, hasher: PasswordHasher, locks: UserLocks) -> Self {
        Self { db, hasher, locks }
    }

    /// Create an account. Fails with `DuplicateUser` if the username or
    /// email is already registered.
    pub async fn register(&self, form: RegisterForm) -> Result<User> {
        form.validate()?;

        let username = form.username.trim().to_string();
        let email = form.email.trim().to_lowercase();

        if self.db.find_user_by_username(&username).await?.is_some() {
            tracing::info!(username = %username, "Registration rejected: username taken");
            return Err(AppError::DuplicateUser);
        }

        let password_hash = self
            .hasher
            .hash(&form.password)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;

        let user = User::new(
            uuid::Uuid::new_v4().to_string(),
            username,
            email,
            password_hash,
        );
        self.db.create_user(&user).await?;

        tracing::info!(user_id = %user.id, "Registered new user");
        Ok(user)
    }

    /// Resolve a username/password pair to a user.
    ///
    /// Unknown usernames and wrong passwords both yield
    /// `InvalidCredentials`.
    pub async fn verify_credential(&self, username: &str, password: &str) -> Result<User> {
        let Some(user) = self.db.find_user_by_username(username.trim()).await? else {
            self.hasher.dummy_verify(password);
            tracing::info!("Login failed");
            return Err(AppError::InvalidCredentials);
        };

        let valid = self
            .hasher
            .verify(password, &user.password_hash)
            .unwrap_or_else(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Stored password hash unreadable");
                false
            });

        if !valid {
            tracing::info!(user_id = %user.id, "Login failed");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "Login succeeded");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Replace the user's learning preferences.
    ///
    /// Only the preferences field is written, under the user's lock, so a
    /// check-in running at the same time keeps its streak and badges.
    pub async fn update_preferences(&self, user_id: &str, form: PreferencesForm) -> Result<User> {
        form.validate()?;
        let preferences = LearningPreferences {
            subjects: normalize_subjects(form.subjects),
            study_time_preference: form.study_time_preference,
            collaboration_level: form.collaboration_level,
        };

        let _guard = self.locks.acquire(user_id).await;
        self.db.set_learning_preferences(user_id, &preferences).await?;
        let user = self.get_user(user_id).await?;

        tracing::debug!(user_id, "Learning preferences updated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;

    fn service() -> AccountService {
        AccountService::new(
            Arc::new(MemoryDb::new()),
            PasswordHasher::new(1_000).unwrap(),
            UserLocks::new(),
        )
    }

    fn form(username: &str, email: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_string(),
            email: email.to_string(),
            password: "hunter2hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_defaults() {
        let svc = service();
        let user = svc.register(form("ada", "Ada@Example.com")).await.unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.streak_count, 0);
        assert!(user.last_checkin.is_none());
        assert!(user.badges.is_empty());
        assert_eq!(
            user.learning_preferences.study_time_preference,
            StudyTimePreference::Morning
        );
        assert_eq!(
            user.learning_preferences.collaboration_level,
            CollaborationLevel::Medium
        );
        assert_ne!(user.password_hash, "hunter2hunter2");
    }

    #[tokio::test]
    async fn test_register_duplicate_username_or_email() {
        let svc = service();
        svc.register(form("ada", "ada@example.com")).await.unwrap();

        assert!(matches!(
            svc.register(form("ada", "new@example.com")).await,
            Err(AppError::DuplicateUser)
        ));
        assert!(matches!(
            svc.register(form("grace", "ADA@example.com")).await,
            Err(AppError::DuplicateUser)
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let svc = service();
        for bad in [
            form("a", "a@example.com"),
            form("has space", "b@example.com"),
            form("carol", "not-an-email"),
            RegisterForm {
                password: "short".to_string(),
                ..form("dave", "d@example.com")
            },
        ] {
            assert!(matches!(
                svc.register(bad).await,
                Err(AppError::BadRequest(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_verify_credential() {
        let svc = service();
        let user = svc.register(form("ada", "ada@example.com")).await.unwrap();

        let ok = svc.verify_credential("ada", "hunter2hunter2").await.unwrap();
        assert_eq!(ok.id, user.id);

        assert!(matches!(
            svc.verify_credential("ada", "wrong-password").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            svc.verify_credential("nobody", "hunter2hunter2").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_update_preferences_normalizes_subjects() {
        let svc = service();
        let user = svc.register(form("ada", "ada@example.com")).await.unwrap();

        let updated = svc
            .update_preferences(
                &user.id,
                PreferencesForm {
                    subjects: vec![" math ".into(), "physics".into(), "math".into()],
                    study_time_preference: StudyTimePreference::Evening,
                    collaboration_level: CollaborationLevel::High,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.learning_preferences.subjects, vec!["math", "physics"]);
        let stored = svc.get_user(&user.id).await.unwrap();
        assert_eq!(stored.learning_preferences, updated.learning_preferences);
    }

    #[tokio::test]
    async fn test_update_preferences_missing_user() {
        let result = service()
            .update_preferences(
                "missing",
                PreferencesForm {
                    subjects: vec![],
                    study_time_preference: StudyTimePreference::Morning,
                    collaboration_level: CollaborationLevel::Low,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        assert!(matches!(
            service().get_user("missing").await,
            Err(AppError::NotFound(_))
        ));
    }
}
