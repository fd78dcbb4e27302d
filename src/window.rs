//! Local day and hour time windows
//!
//! Converts local wall-clock boundaries of a calendar day (or of one hour
//! within it) into absolute UTC instants. Every boundary is shifted by the
//! same UTC offset, so the 24 hourly windows exactly partition the day window.
//!
//! The offset is taken once per date. Across a daylight-saving transition the
//! real local day is 23 or 25 hours long; these windows still cover 24 hours.

use crate::error::ActivityError;
use crate::types::{TimeWindow, HOURS_PER_DAY};
use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};

/// Builds UTC windows for local days and hours at a fixed UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBuilder {
    offset: FixedOffset,
}

impl Default for WindowBuilder {
    fn default() -> Self {
        Self::utc()
    }
}

impl WindowBuilder {
    /// Builder for a zero offset
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Builder for an offset in minutes east of UTC (e.g. -300 for UTC-05:00)
    pub fn new(utc_offset_minutes: i32) -> Result<Self, ActivityError> {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ActivityError::ConfigError(format!(
                    "UTC offset out of range: {} minutes",
                    utc_offset_minutes
                ))
            })?;
        Ok(Self { offset })
    }

    /// Builder using the host time zone's offset in effect on `date`
    pub fn local_for(date: NaiveDate) -> Self {
        let noon = date.and_time(NaiveTime::MIN) + Duration::hours(12);
        let offset = Local
            .offset_from_local_datetime(&noon)
            .earliest()
            .map(|o| o.fix())
            .unwrap_or_else(|| Local.offset_from_utc_datetime(&noon).fix());
        Self { offset }
    }

    /// Offset in minutes east of UTC
    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    /// Window covering the whole local day, `00:00:00.000` to `23:59:59.999`
    pub fn day_window(&self, date: NaiveDate) -> TimeWindow {
        let start = date.and_time(NaiveTime::MIN);
        self.window(start, Duration::days(1))
    }

    /// Window covering local hour `hour` of `date`, `hh:00:00.000` to `hh:59:59.999`.
    ///
    /// `hour` must be in 0-23. Larger values are not checked in release builds
    /// and roll over into the following day.
    pub fn hour_window(&self, date: NaiveDate, hour: u32) -> TimeWindow {
        debug_assert!((hour as usize) < HOURS_PER_DAY, "hour out of range: {}", hour);
        let start = date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour));
        self.window(start, Duration::hours(1))
    }

    /// All 24 hourly windows of `date`, in hour order
    pub fn hourly_windows(&self, date: NaiveDate) -> [TimeWindow; HOURS_PER_DAY] {
        std::array::from_fn(|hour| self.hour_window(date, hour as u32))
    }

    fn window(&self, local_start: NaiveDateTime, length: Duration) -> TimeWindow {
        let local_end = local_start + length - Duration::milliseconds(1);
        TimeWindow::new(self.to_utc(local_start), self.to_utc(local_end))
    }

    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let shifted = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&shifted)
    }
}
