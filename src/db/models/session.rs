//! Sleep session records and quality ratings.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Stored quality of a session that has not been rated yet.
pub const UNRATED: i32 = -1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SleepQuality {
    VeryBad,
    Poor,
    SoSo,
    Ok,
    PrettyGood,
    Excellent,
}

impl SleepQuality {
    pub const ALL: [SleepQuality; 6] = [
        SleepQuality::VeryBad,
        SleepQuality::Poor,
        SleepQuality::SoSo,
        SleepQuality::Ok,
        SleepQuality::PrettyGood,
        SleepQuality::Excellent,
    ];

    pub fn as_i32(self) -> i32 {
        match self {
            SleepQuality::VeryBad => 0,
            SleepQuality::Poor => 1,
            SleepQuality::SoSo => 2,
            SleepQuality::Ok => 3,
            SleepQuality::PrettyGood => 4,
            SleepQuality::Excellent => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SleepQuality::VeryBad => "Very bad",
            SleepQuality::Poor => "Poor",
            SleepQuality::SoSo => "So-so",
            SleepQuality::Ok => "OK",
            SleepQuality::PrettyGood => "Pretty good",
            SleepQuality::Excellent => "Excellent",
        }
    }
}

impl TryFrom<i32> for SleepQuality {
    type Error = InvalidQuality;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        SleepQuality::ALL
            .into_iter()
            .find(|quality| quality.as_i32() == value)
            .ok_or(InvalidQuality(value))
    }
}

impl fmt::Display for SleepQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("sleep quality must be between 0 and 5, got {0}")]
pub struct InvalidQuality(pub i32);

/// One tracked sleep interval.
///
/// While the session is active `end_time_ms == start_time_ms`; the equality is
/// a sentinel, not a zero-length night.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: i64,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub quality: i32,
}

impl SessionRecord {
    /// A fresh, not-yet-inserted active record starting at `now_ms`.
    pub fn begin(now_ms: i64) -> Self {
        Self {
            id: 0,
            start_time_ms: now_ms,
            end_time_ms: now_ms,
            quality: UNRATED,
        }
    }

    pub fn is_active(&self) -> bool {
        self.end_time_ms == self.start_time_ms
    }

    pub fn duration_ms(&self) -> i64 {
        (self.end_time_ms - self.start_time_ms).max(0)
    }

    /// `None` while unrated or if the stored value is outside the known scale.
    pub fn rating(&self) -> Option<SleepQuality> {
        SleepQuality::try_from(self.quality).ok()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.start_time_ms).single()
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        if self.is_active() {
            return None;
        }
        Utc.timestamp_millis_opt(self.end_time_ms).single()
    }
}
