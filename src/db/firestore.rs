// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Firestore implementation of [`Store`].
//!
//! Layout:
//! - `users/{user_id}`: profile and cached streak projection
//! - `usernames/{username}`, `emails/{email}`: uniqueness reservations
//! - `checkins/{user_id}_{date}`: one document per user per day
//! - `badge_awards/{user_id}_{slug}`: append-only ledger
//!
//! Uniqueness is enforced with `exists = false` write preconditions inside
//! transactions, so a losing concurrent writer fails at commit time instead
//! of overwriting. User documents are written with an `update_time`
//! precondition taken from the read, so a stale copy never lands.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use firestore::{
    FirestoreDocument, FirestoreGetByIdSupport, FirestoreQueryDirection,
    FirestoreWritePrecondition,
};
use firestore::errors::FirestoreError;
use serde::{Deserialize, Serialize};

use crate::db::{collections, Commit, Revision, Store};
use crate::error::AppError;
use crate::models::checkin::checkin_document_id;
use crate::models::{BadgeAward, CheckIn, LearningPreferences, User};

/// Uniqueness reservation pointing back at the owning user.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Reservation {
    user_id: String,
}

/// Field-masked write of a user's preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreferencesPatch {
    learning_preferences: LearningPreferences,
}

const PREFERENCES_FIELD: &str = "learning_preferences";

fn revision_of(doc: &FirestoreDocument) -> Result<Revision, AppError> {
    let update_time = doc
        .update_time
        .clone()
        .ok_or_else(|| AppError::Database("User document has no update time".to_string()))?;
    let updated = firestore::timestamp_utils::from_timestamp(update_time)
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(Revision(updated.timestamp_micros()))
}

fn matches_revision(revision: Revision) -> Result<FirestoreWritePrecondition, AppError> {
    DateTime::from_timestamp_micros(revision.0)
        .map(FirestoreWritePrecondition::UpdateTime)
        .ok_or_else(|| AppError::Database(format!("Invalid user revision {}", revision.0)))
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. Every operation returns a database error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn get_reservation(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<Reservation>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(key)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_user_doc(&self, user_id: &str) -> Result<Option<FirestoreDocument>, AppError> {
        match self
            .get_client()?
            .get_doc(collections::USERS, user_id, None)
            .await
        {
            Ok(doc) => Ok(Some(doc)),
            Err(FirestoreError::DataNotFoundError(_)) => Ok(None),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn user_revision(&self, user_id: &str) -> Result<Option<Revision>, AppError> {
        self.get_user_doc(user_id)
            .await?
            .as_ref()
            .map(revision_of)
            .transpose()
    }

    async fn identity_taken(&self, username: &str, email: &str) -> Result<bool, AppError> {
        Ok(self
            .get_reservation(collections::USERNAMES, username)
            .await?
            .is_some()
            || self
                .get_reservation(collections::EMAILS, email)
                .await?
                .is_some())
    }
}

#[async_trait]
impl Store for FirestoreDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        match self
            .get_reservation(collections::USERNAMES, username)
            .await?
        {
            Some(reservation) => self.get_user(&reservation.user_id).await,
            None => Ok(None),
        }
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let client = self.get_client()?;
        let email = user.email.to_lowercase();

        if self.identity_taken(&user.username, &email).await? {
            return Err(AppError::DuplicateUser);
        }

        let reservation = Reservation {
            user_id: user.id.clone(),
        };

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for (collection, key) in [
            (collections::USERNAMES, user.username.as_str()),
            (collections::EMAILS, email.as_str()),
        ] {
            client
                .fluent()
                .update()
                .in_col(collection)
                .precondition(FirestoreWritePrecondition::Exists(false))
                .document_id(key)
                .object(&reservation)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add reservation to transaction: {}", e))
                })?;
        }

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&user.id)
            .object(user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add user to transaction: {}", e))
            })?;

        if let Err(e) = transaction.commit().await {
            // A failed precondition means someone else took the name first.
            if self.identity_taken(&user.username, &email).await? {
                return Err(AppError::DuplicateUser);
            }
            return Err(AppError::Database(format!(
                "Transaction commit failed: {}",
                e
            )));
        }

        tracing::info!(user_id = %user.id, username = %user.username, "User created");
        Ok(())
    }

    async fn get_user_for_update(
        &self,
        user_id: &str,
    ) -> Result<Option<(User, Revision)>, AppError> {
        let Some(doc) = self.get_user_doc(user_id).await? else {
            return Ok(None);
        };
        let user = firestore::FirestoreDb::deserialize_doc_to::<User>(&doc)
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(Some((user, revision_of(&doc)?)))
    }

    async fn set_learning_preferences(
        &self,
        user_id: &str,
        preferences: &LearningPreferences,
    ) -> Result<(), AppError> {
        let patch = PreferencesPatch {
            learning_preferences: preferences.clone(),
        };

        let result: Result<PreferencesPatch, FirestoreError> = self
            .get_client()?
            .fluent()
            .update()
            .fields([PREFERENCES_FIELD])
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(user_id)
            .object(&patch)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(FirestoreError::DataNotFoundError(_)) => {
                Err(AppError::NotFound(format!("User {} not found", user_id)))
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn get_checkin(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<CheckIn>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CHECKINS)
            .obj()
            .one(&checkin_document_id(user_id, date))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn recent_checkins(&self, user_id: &str, limit: u32) -> Result<Vec<CheckIn>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CHECKINS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            // ISO dates sort lexicographically
            .order_by([("date", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn all_checkins(&self, user_id: &str) -> Result<Vec<CheckIn>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CHECKINS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([("date", FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn badge_awards(&self, user_id: &str) -> Result<Vec<BadgeAward>, AppError> {
        let user_id = user_id.to_string();
        let mut awards: Vec<BadgeAward> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::BADGE_AWARDS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        awards.sort_by_key(|a| a.awarded_at);
        Ok(awards)
    }

    /// Atomically write the check-in, badge awards and user document.
    ///
    /// The check-in and award documents carry an `exists = false`
    /// precondition, so if another instance already wrote the same day the
    /// whole transaction is rejected and nothing is applied. The user write
    /// must match the revision it was read at.
    async fn commit(&self, commit: &Commit) -> Result<(), AppError> {
        let client = self.get_client()?;
        let user = &commit.user;

        let Some(current) = self.user_revision(&user.id).await? else {
            tracing::warn!(user_id = %user.id, "User not found, aborting commit");
            return Err(AppError::NotFound(format!("User {} not found", user.id)));
        };

        if let Some(checkin) = &commit.checkin {
            if self.get_checkin(&checkin.user_id, checkin.date).await?.is_some() {
                return Err(AppError::DuplicateCheckin);
            }
        }

        if current != commit.revision {
            tracing::info!(user_id = %user.id, "User changed since read, rejecting commit");
            return Err(AppError::ConcurrentUpdate);
        }

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        if let Some(checkin) = &commit.checkin {
            client
                .fluent()
                .update()
                .in_col(collections::CHECKINS)
                .precondition(FirestoreWritePrecondition::Exists(false))
                .document_id(checkin.document_id())
                .object(checkin)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add check-in to transaction: {}", e))
                })?;
        }

        for award in &commit.awards {
            client
                .fluent()
                .update()
                .in_col(collections::BADGE_AWARDS)
                .precondition(FirestoreWritePrecondition::Exists(false))
                .document_id(award.document_id())
                .object(award)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add award to transaction: {}", e))
                })?;
        }

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .precondition(matches_revision(commit.revision)?)
            .document_id(&user.id)
            .object(user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add user to transaction: {}", e))
            })?;

        if let Err(e) = transaction.commit().await {
            if let Some(checkin) = &commit.checkin {
                if self.get_checkin(&checkin.user_id, checkin.date).await?.is_some() {
                    tracing::info!(
                        user_id = %user.id,
                        date = %checkin.date,
                        "Concurrent check-in won the race"
                    );
                    return Err(AppError::DuplicateCheckin);
                }
            }
            if self.user_revision(&user.id).await? != Some(commit.revision) {
                tracing::info!(user_id = %user.id, "Concurrent user write won the race");
                return Err(AppError::ConcurrentUpdate);
            }
            return Err(AppError::Database(format!(
                "Transaction commit failed: {}",
                e
            )));
        }

        tracing::debug!(
            user_id = %user.id,
            checkin = commit.checkin.is_some(),
            awards = commit.awards.len(),
            "Commit applied"
        );

        Ok(())
    }
}
