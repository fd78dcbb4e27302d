//! Aggregator configuration

use crate::error::ActivityError;
use crate::window::WindowBuilder;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How the 48 hourly reads are issued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// All hourly reads in flight at once, joined fail-fast
    #[default]
    Concurrent,
    /// One read at a time, hour 0 through 23
    Sequential,
}

/// Settings for a [`crate::DailyAggregator`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Fixed UTC offset in minutes east of UTC. `None` uses the host time zone.
    pub utc_offset_minutes: Option<i32>,
    /// Read scheduling for hourly windows
    pub fetch_mode: FetchMode,
}

impl AggregatorConfig {
    /// Load configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ActivityError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ActivityError> {
        if let Some(minutes) = self.utc_offset_minutes {
            WindowBuilder::new(minutes)?;
        }
        Ok(())
    }

    /// Window builder for `date` under this configuration
    pub fn window_builder(&self, date: NaiveDate) -> Result<WindowBuilder, ActivityError> {
        match self.utc_offset_minutes {
            Some(minutes) => WindowBuilder::new(minutes),
            None => Ok(WindowBuilder::local_for(date)),
        }
    }
}
