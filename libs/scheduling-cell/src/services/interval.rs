use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use availability_cell::models::{TimeBlock, WeeklyAvailabilityRule};

use crate::models::SchedulingError;

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Validated constructor; `start` must be strictly before `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SchedulingError> {
        if start >= end {
            return Err(SchedulingError::InvalidTime(format!(
                "start {} must be before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    pub fn starting_at(start: DateTime<Utc>, minutes: i64) -> Result<Self, SchedulingError> {
        let duration = Duration::try_minutes(minutes)
            .ok_or_else(|| SchedulingError::InvalidTime(format!("duration of {} minutes is out of range", minutes)))?;
        let end = start
            .checked_add_signed(duration)
            .ok_or_else(|| SchedulingError::InvalidTime("interval end overflows".to_string()))?;
        Self::new(start, end)
    }

    /// Unchecked constructor for bounds that come from already-validated data.
    pub(crate) fn from_bounds(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The calendar day `[date 00:00, date+1 00:00)` in UTC. Fails on the
    /// last representable date.
    pub fn day(date: NaiveDate) -> Result<Self, SchedulingError> {
        let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
        let end = start
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| SchedulingError::InvalidTime(format!("date {} is out of range", date)))?;
        Ok(Self { start, end })
    }

    /// Window of a weekly rule on a concrete date.
    pub fn of_rule(rule: &WeeklyAvailabilityRule, date: NaiveDate) -> Self {
        let (start, end) = rule.window_on(date);
        Self { start, end }
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl From<&TimeBlock> for Interval {
    fn from(block: &TimeBlock) -> Self {
        Self::from_bounds(block.start_time, block.end_time)
    }
}

/// Fixed-stride sliding windows of length `duration` inside `window`.
/// A window is emitted only while it ends at or before `window.end`.
pub fn stride_windows(window: Interval, duration: Duration, stride: Duration) -> StrideWindows {
    StrideWindows { cursor: window.start, limit: window.end, duration, stride }
}

pub struct StrideWindows {
    cursor: DateTime<Utc>,
    limit: DateTime<Utc>,
    duration: Duration,
    stride: Duration,
}

impl Iterator for StrideWindows {
    type Item = Interval;

    fn next(&mut self) -> Option<Interval> {
        if self.duration <= Duration::zero() || self.stride <= Duration::zero() {
            return None;
        }
        let end = self.cursor.checked_add_signed(self.duration)?;
        if end > self.limit {
            return None;
        }
        let slot = Interval { start: self.cursor, end };
        self.cursor = self.cursor.checked_add_signed(self.stride)?;
        Some(slot)
    }
}
