// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Data models for the application.

pub mod badge;
pub mod checkin;
pub mod user;

pub use badge::BadgeAward;
pub use checkin::CheckIn;
pub use user::{LearningPreferences, User};
