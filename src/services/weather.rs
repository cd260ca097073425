// SPDX-License-Identifier: MIT
// Copyright 2026 NEXUS contributors

//! Engagement score and the cosmetic "virtual weather" it drives.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum WeatherCondition {
    Rainy,
    Cloudy,
    PartlyCloudy,
    Sunny,
}

impl WeatherCondition {
    pub fn description(self) -> &'static str {
        match self {
            WeatherCondition::Sunny => {
                "Brilliant sunshine! Your dedication is lighting up the classroom!"
            }
            WeatherCondition::PartlyCloudy => {
                "Partly cloudy with rays of success breaking through!"
            }
            WeatherCondition::Cloudy => {
                "Overcast skies. Time to bring some sunshine with consistent study!"
            }
            WeatherCondition::Rainy => {
                "Stormy weather ahead. Start your learning journey to clear the skies!"
            }
        }
    }

    fn from_score(score: f64) -> Self {
        if score >= 100.0 {
            WeatherCondition::Sunny
        } else if score >= 50.0 {
            WeatherCondition::PartlyCloudy
        } else if score >= 20.0 {
            WeatherCondition::Cloudy
        } else {
            WeatherCondition::Rainy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Weather {
    pub condition: WeatherCondition,
    pub description: String,
    pub score: f64,
}

/// `streak * 10 + total / 10`, with real (not integer) division.
pub fn engagement_score(streak_count: u32, total_study_time: u64) -> f64 {
    f64::from(streak_count) * 10.0 + total_study_time as f64 / 10.0
}

pub fn compute_weather(streak_count: u32, total_study_time: u64) -> Weather {
    let score = engagement_score(streak_count, total_study_time);
    let condition = WeatherCondition::from_score(score);
    Weather {
        condition,
        description: condition.description().to_string(),
        score,
    }
}
