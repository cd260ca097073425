// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Shared helpers for date/time handling.
//!
//! Check-ins are bucketed by UTC calendar date; everything that needs "today"
//! goes through [`utc_today`] so the core only ever sees `NaiveDate`.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current calendar date in UTC.
pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Signed number of days from `earlier` to `later`.
///
/// Negative when `later` precedes `earlier` (clock skew or backdating).
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    later.signed_duration_since(earlier).num_days()
}
