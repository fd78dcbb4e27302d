//! Core types for Synheart Activity
//!
//! This module defines the data structures that flow through aggregation:
//! provider records, time windows, hourly totals, and the daily result.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Number of hourly buckets in a local day
pub const HOURS_PER_DAY: usize = 24;

/// Category of health measurement read from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricKind {
    /// Integer step count
    Steps,
    /// Floating-point energy in kilocalories
    TotalCaloriesBurned,
}

impl MetricKind {
    /// Both metrics, in the order they are requested
    pub const ALL: [MetricKind; 2] = [MetricKind::Steps, MetricKind::TotalCaloriesBurned];

    /// Provider record-type name
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Steps => "Steps",
            MetricKind::TotalCaloriesBurned => "TotalCaloriesBurned",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access level of a provider permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Read,
}

/// A permission requested from (and granted by) the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub access_type: AccessType,
    pub record_type: MetricKind,
}

impl Permission {
    pub fn read(record_type: MetricKind) -> Self {
        Self {
            access_type: AccessType::Read,
            record_type,
        }
    }
}

/// Energy measurement attached to a calorie record
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Energy {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub in_kilocalories: Option<f64>,
}

/// A single record returned by the provider.
///
/// Step records carry `count`, calorie records carry `energy`. The aggregator
/// never inspects the timestamps; the provider filters by window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    /// Record start time (UTC)
    pub start_time: DateTime<Utc>,
    /// Record end time (UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Number of steps
    #[serde(default, deserialize_with = "lenient_i64", skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    /// Energy burned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<Energy>,
}

impl ActivityRecord {
    /// Create a step record
    pub fn steps(start_time: DateTime<Utc>, end_time: DateTime<Utc>, count: i64) -> Self {
        Self {
            start_time,
            end_time: Some(end_time),
            count: Some(count),
            energy: None,
        }
    }

    /// Create a calorie record
    pub fn energy(start_time: DateTime<Utc>, end_time: DateTime<Utc>, kilocalories: f64) -> Self {
        Self {
            start_time,
            end_time: Some(end_time),
            count: None,
            energy: Some(Energy {
                in_kilocalories: Some(kilocalories),
            }),
        }
    }

    /// Energy in kilocalories, if present
    pub fn kilocalories(&self) -> Option<f64> {
        self.energy.and_then(|e| e.in_kilocalories)
    }
}

// Malformed measurements deserialize as absent rather than failing the batch.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_i64()))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).filter(|v| v.is_finite()))
}

/// Inclusive time range used to filter provider records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// First instant of the window (inclusive)
    pub start: DateTime<Utc>,
    /// Last instant of the window (inclusive)
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whether `instant` falls within the window, both bounds inclusive
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Whether two windows share at least one instant
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.end.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// Summed metric value for every hour of the day (0-23, always all present)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyTotals<T> {
    values: [T; HOURS_PER_DAY],
}

impl<T: Copy + Default> Default for HourlyTotals<T> {
    fn default() -> Self {
        Self {
            values: [T::default(); HOURS_PER_DAY],
        }
    }
}

impl<T: Copy> HourlyTotals<T> {
    /// Value for `hour` (0-23)
    pub fn get(&self, hour: u32) -> T {
        self.values[hour as usize]
    }

    pub fn set(&mut self, hour: u32, value: T) {
        self.values[hour as usize] = value;
    }

    /// `(hour, value)` pairs in hour order
    pub fn iter(&self) -> impl Iterator<Item = (u32, T)> + '_ {
        self.values.iter().enumerate().map(|(h, v)| (h as u32, *v))
    }
}

impl<T: Copy + std::iter::Sum<T>> HourlyTotals<T> {
    /// Sum across all 24 hours
    pub fn total(&self) -> T {
        self.values.iter().copied().sum()
    }
}

/// Aggregated activity for one local calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyResult {
    /// Local calendar date
    pub date: NaiveDate,
    /// Full-day window the totals were read for
    pub window: TimeWindow,
    /// Total step count for the day
    pub total_steps: u64,
    /// Total energy burned for the day (kcal, full precision)
    pub total_energy_kcal: f64,
    /// Steps per local hour
    pub steps_by_hour: HourlyTotals<u64>,
    /// Energy per local hour (kcal)
    pub energy_by_hour: HourlyTotals<f64>,
}
