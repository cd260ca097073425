// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Services module - business logic layer.

pub mod accounts;
pub mod badges;
pub mod checkin;
pub mod locks;
pub mod password;
pub mod streak;
pub mod weather;

pub use accounts::AccountService;
pub use checkin::CheckinService;
pub use locks::UserLocks;
pub use password::PasswordHasher;
