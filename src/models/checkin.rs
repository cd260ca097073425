// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Daily check-in record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One user's study log for one UTC calendar date. Never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    /// Owning user ID
    pub user_id: String,
    /// UTC calendar date; unique per user
    pub date: NaiveDate,
    /// Minutes studied
    pub study_time: u32,
    /// Subjects covered, deduplicated
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub notes: String,
    /// When the check-in was submitted
    pub timestamp: DateTime<Utc>,
}

impl CheckIn {
    /// Document ID encoding the (user, date) uniqueness key.
    pub fn document_id(&self) -> String {
        checkin_document_id(&self.user_id, self.date)
    }
}

/// Document ID for the check-in of `user_id` on `date`.
pub fn checkin_document_id(user_id: &str, date: NaiveDate) -> String {
    format!("{}_{}", user_id, date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_is_user_and_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(checkin_document_id("abc", date), "abc_2024-03-09");
    }

    #[test]
    fn test_date_serializes_as_plain_string() {
        let checkin = CheckIn {
            user_id: "u1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            study_time: 45,
            subjects: vec!["math".to_string()],
            notes: String::new(),
            timestamp: DateTime::from_timestamp(1_709_980_000, 0).unwrap(),
        };

        let json = serde_json::to_value(&checkin).unwrap();
        assert_eq!(json["date"], "2024-03-09");
    }
}
