// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! NEXUS Tracker: daily study check-ins, streaks and badges
//!
//! This crate provides the backend API for recording study check-ins,
//! deriving streaks, awarding achievement badges and scoring engagement.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::Store;
use services::{AccountService, CheckinService, PasswordHasher, UserLocks};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Store>,
    pub accounts: AccountService,
    pub checkins: CheckinService,
}

impl AppState {
    /// Wire the services over `db`.
    pub fn new(config: Config, db: Arc<dyn Store>) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::new(config.password_hash_iterations)?;
        // Both services write the user document, so they share one lock map.
        let user_locks = UserLocks::new();

        Ok(Self {
            accounts: AccountService::new(db.clone(), hasher, user_locks.clone()),
            checkins: CheckinService::new(db.clone(), user_locks),
            config,
            db,
        })
    }
}
