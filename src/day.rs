//! Local calendar-day arithmetic.
//!
//! Snapshots are stored with unix-second timestamps; "today" is the local
//! calendar day of the system time zone.

use crate::constants::SECS_PER_DAY;
use chrono::{Local, NaiveDate, TimeZone};
use serde::Serialize;

/// Current time as unix seconds.
pub fn now_unix() -> i64 {
    Local::now().timestamp()
}

/// Half-open `[start, end)` range of one local calendar day in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayBounds {
    pub start: i64,
    pub end: i64,
}

impl DayBounds {
    pub fn containing(timestamp: i64) -> Self {
        Local
            .timestamp_opt(timestamp, 0)
            .single()
            .and_then(|dt| Self::for_date(dt.date_naive()))
            .unwrap_or_else(|| Self::utc_day(timestamp))
    }

    pub fn today() -> Self {
        Self::containing(now_unix())
    }

    pub fn for_date(date: NaiveDate) -> Option<Self> {
        let start = local_midnight(date)?;
        let end = local_midnight(date.succ_opt()?)?;
        Some(Self { start, end })
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    pub fn previous(&self) -> Self {
        Self::containing(self.start - 1)
    }

    /// Last second that still belongs to this day.
    pub fn last_second(&self) -> i64 {
        self.end - 1
    }

    pub fn date(&self) -> Option<NaiveDate> {
        Local
            .timestamp_opt(self.start, 0)
            .single()
            .map(|dt| dt.date_naive())
    }

    fn utc_day(timestamp: i64) -> Self {
        let start = timestamp - timestamp.rem_euclid(SECS_PER_DAY);
        Self {
            start,
            end: start + SECS_PER_DAY,
        }
    }
}

// Midnight can be skipped by a DST change; fall back to the first hour.
fn local_midnight(date: NaiveDate) -> Option<i64> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| Local.from_local_datetime(&date.and_hms_opt(1, 0, 0)?).earliest())
        .map(|dt| dt.timestamp())
}
