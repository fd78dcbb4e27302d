//! Synheart Activity - Hourly and daily step and energy totals
//!
//! Activity reads step-count and calorie-burn records from a platform health
//! data provider and reduces them into per-hour and whole-day totals for a
//! local calendar date: window building → provider reads → summation →
//! report rendering.
//!
//! ## Modules
//!
//! - **Windows**: local day and hour boundaries as UTC instants
//! - **Aggregator**: the 50 provider reads for a day and their totals
//! - **Session**: owned screen state with day navigation and stale-run discarding

pub mod aggregator;
pub mod config;
pub mod error;
pub mod provider;
pub mod report;
pub mod session;
pub mod types;
pub mod window;

pub use aggregator::{sum_energy, sum_steps, DailyAggregator};
pub use config::{AggregatorConfig, FetchMode};
pub use error::{ActivityError, ProviderError};
pub use provider::{HealthDataProvider, InMemoryProvider};
pub use report::DailyReport;
pub use session::{ActivitySession, RunOutcome, RunTicket};
pub use types::{ActivityRecord, DailyResult, HourlyTotals, MetricKind, Permission, TimeWindow};
pub use window::WindowBuilder;

/// Activity version
pub const ACTIVITY_VERSION: &str = env!("CARGO_PKG_VERSION");
