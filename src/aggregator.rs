//! Daily activity aggregation
//!
//! Reads step and energy records for the full local day and for each of its
//! 24 hours, then reduces each batch to a scalar total.
//!
//! Stages:
//! 1. Prepare - initialize the provider and obtain read permissions
//! 2. Windows - build the day window and the 24 hourly windows
//! 3. Fetch - 2 reads for the day plus 2 per hour (50 in total)
//! 4. Reduce - sum counts and kilocalories per window
//!
//! Any failed read aborts the whole day; partial totals are never returned.

use crate::config::{AggregatorConfig, FetchMode};
use crate::error::{ActivityError, ProviderError};
use crate::provider::HealthDataProvider;
use crate::types::{
    AccessType, ActivityRecord, DailyResult, HourlyTotals, MetricKind, Permission, TimeWindow,
    HOURS_PER_DAY,
};
use chrono::NaiveDate;
use futures::future::try_join_all;
use tracing::{debug, info, warn};

/// Sum of step counts. Missing or negative counts contribute 0.
pub fn sum_steps(records: &[ActivityRecord]) -> u64 {
    records
        .iter()
        .filter_map(|r| r.count)
        .filter(|c| *c > 0)
        .fold(0u64, |acc, c| acc.saturating_add(c as u64))
}

/// Sum of energy in kilocalories. Missing, negative or non-finite values contribute 0.
pub fn sum_energy(records: &[ActivityRecord]) -> f64 {
    records
        .iter()
        .filter_map(ActivityRecord::kilocalories)
        .filter(|kcal| kcal.is_finite() && *kcal > 0.0)
        .sum()
}

/// Largest difference between hourly and daily energy treated as rounding noise
const ENERGY_TOLERANCE_KCAL: f64 = 1e-6;

/// Totals read for one window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct WindowTotals {
    steps: u64,
    energy_kcal: f64,
}

// Steps must match exactly; energy within a tolerance scaled to the day total.
fn hourly_totals_match(
    day: &WindowTotals,
    steps_by_hour: &HourlyTotals<u64>,
    energy_by_hour: &HourlyTotals<f64>,
) -> bool {
    let energy_drift = (energy_by_hour.total() - day.energy_kcal).abs();
    steps_by_hour.total() == day.steps
        && energy_drift <= ENERGY_TOLERANCE_KCAL * day.energy_kcal.abs().max(1.0)
}

/// Aggregates a provider's records into per-hour and per-day totals
pub struct DailyAggregator<P> {
    provider: P,
    config: AggregatorConfig,
}

impl<P: HealthDataProvider> DailyAggregator<P> {
    /// Create an aggregator with default settings
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, AggregatorConfig::default())
    }

    pub fn with_config(provider: P, config: AggregatorConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Initialize the provider and request read access to both metrics.
    ///
    /// Returns the granted permissions. Fails before any record is read if
    /// the provider is unavailable or any metric is not granted.
    pub async fn prepare(&self) -> Result<Vec<Permission>, ActivityError> {
        match self.provider.initialize().await {
            Ok(true) => {}
            Ok(false) => {
                warn!("health data provider unavailable");
                return Err(ActivityError::ProviderInitFailed);
            }
            Err(e) => {
                warn!(error = %e, "health data provider failed to initialize");
                return Err(ActivityError::ProviderInitFailed);
            }
        }

        let requested: Vec<Permission> = MetricKind::ALL.into_iter().map(Permission::read).collect();
        let granted = self
            .provider
            .request_permission(&requested)
            .await
            .map_err(|e| match e {
                ProviderError::NotInitialized => ActivityError::ProviderInitFailed,
                _ => ActivityError::PermissionDenied(MetricKind::ALL.to_vec()),
            })?;

        let missing: Vec<MetricKind> = MetricKind::ALL
            .into_iter()
            .filter(|metric| {
                !granted
                    .iter()
                    .any(|p| p.record_type == *metric && p.access_type == AccessType::Read)
            })
            .collect();

        if !missing.is_empty() {
            warn!(?missing, "read permission not granted");
            return Err(ActivityError::PermissionDenied(missing));
        }

        debug!(?granted, "permissions granted");
        Ok(granted)
    }

    /// Prepare the provider, then aggregate `date`
    pub async fn aggregate(&self, date: NaiveDate) -> Result<DailyResult, ActivityError> {
        self.prepare().await?;
        self.collect(date).await
    }

    /// Aggregate `date` against an already prepared provider
    pub async fn collect(&self, date: NaiveDate) -> Result<DailyResult, ActivityError> {
        let builder = self.config.window_builder(date)?;
        let day = builder.day_window(date);
        let hours = builder.hourly_windows(date);

        info!(
            %date,
            offset_minutes = builder.offset_minutes(),
            mode = ?self.config.fetch_mode,
            "aggregating daily activity"
        );

        let (day_totals, hourly) = match self.config.fetch_mode {
            FetchMode::Concurrent => {
                futures::try_join!(
                    self.read_window(day),
                    try_join_all(hours.iter().map(|w| self.read_window(*w)))
                )?
            }
            FetchMode::Sequential => {
                let day_totals = self.read_window(day).await?;
                let mut hourly = Vec::with_capacity(HOURS_PER_DAY);
                for window in &hours {
                    hourly.push(self.read_window(*window).await?);
                }
                (day_totals, hourly)
            }
        };

        let mut steps_by_hour = HourlyTotals::<u64>::default();
        let mut energy_by_hour = HourlyTotals::<f64>::default();
        for (hour, totals) in hourly.iter().enumerate() {
            steps_by_hour.set(hour as u32, totals.steps);
            energy_by_hour.set(hour as u32, totals.energy_kcal);
        }

        if !hourly_totals_match(&day_totals, &steps_by_hour, &energy_by_hour) {
            warn!(
                %date,
                day_steps = day_totals.steps,
                hourly_steps = steps_by_hour.total(),
                day_energy_kcal = day_totals.energy_kcal,
                hourly_energy_kcal = energy_by_hour.total(),
                "hourly totals do not add up to the day totals"
            );
        }

        Ok(DailyResult {
            date,
            window: day,
            total_steps: day_totals.steps,
            total_energy_kcal: day_totals.energy_kcal,
            steps_by_hour,
            energy_by_hour,
        })
    }

    async fn read_window(&self, window: TimeWindow) -> Result<WindowTotals, ActivityError> {
        let (steps, energy) = match self.config.fetch_mode {
            FetchMode::Concurrent => futures::try_join!(
                self.read(MetricKind::Steps, &window),
                self.read(MetricKind::TotalCaloriesBurned, &window)
            )?,
            FetchMode::Sequential => (
                self.read(MetricKind::Steps, &window).await?,
                self.read(MetricKind::TotalCaloriesBurned, &window).await?,
            ),
        };

        let totals = WindowTotals {
            steps: sum_steps(&steps),
            energy_kcal: sum_energy(&energy),
        };
        debug!(
            %window,
            steps = totals.steps,
            energy_kcal = totals.energy_kcal,
            "window totals"
        );
        Ok(totals)
    }

    async fn read(
        &self,
        metric: MetricKind,
        window: &TimeWindow,
    ) -> Result<Vec<ActivityRecord>, ActivityError> {
        self.provider
            .read_records(metric, window)
            .await
            .map_err(|source| {
                warn!(%metric, %window, error = %source, "record read failed");
                ActivityError::FetchFailed {
                    metric,
                    window: *window,
                    source,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    fn config(offset: i32, fetch_mode: FetchMode) -> AggregatorConfig {
        AggregatorConfig {
            utc_offset_minutes: Some(offset),
            fetch_mode,
        }
    }

    /// Counts reads and optionally fails one window
    struct CountingProvider {
        inner: InMemoryProvider,
        reads: AtomicUsize,
        fail_hour_start: Option<DateTime<Utc>>,
    }

    impl CountingProvider {
        fn new(inner: InMemoryProvider) -> Self {
            Self {
                inner,
                reads: AtomicUsize::new(0),
                fail_hour_start: None,
            }
        }
    }

    #[async_trait]
    impl HealthDataProvider for CountingProvider {
        async fn initialize(&self) -> Result<bool, ProviderError> {
            self.inner.initialize().await
        }

        async fn request_permission(
            &self,
            permissions: &[Permission],
        ) -> Result<Vec<Permission>, ProviderError> {
            self.inner.request_permission(permissions).await
        }

        async fn read_records(
            &self,
            metric: MetricKind,
            window: &TimeWindow,
        ) -> Result<Vec<ActivityRecord>, ProviderError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_hour_start == Some(window.start) && metric == MetricKind::TotalCaloriesBurned {
                return Err(ProviderError::Io("disk error".to_string()));
            }
            self.inner.read_records(metric, window).await
        }
    }

    #[test]
    fn test_sum_steps_ignores_missing_and_negative() {
        let records = vec![
            ActivityRecord::steps(utc(1, 0), utc(1, 5), 100),
            ActivityRecord::steps(utc(1, 5), utc(1, 10), -40),
            ActivityRecord {
                start_time: utc(1, 10),
                ..Default::default()
            },
        ];
        assert_eq!(sum_steps(&records), 100);
        assert_eq!(sum_steps(&[]), 0);
    }

    #[test]
    fn test_sum_energy_never_nan_or_negative() {
        let records = vec![
            ActivityRecord::energy(utc(1, 0), utc(1, 5), 10.5),
            ActivityRecord::energy(utc(1, 5), utc(1, 10), f64::NAN),
            ActivityRecord::energy(utc(1, 10), utc(1, 15), -3.0),
            ActivityRecord::steps(utc(1, 15), utc(1, 20), 30),
        ];
        let total = sum_energy(&records);
        assert_eq!(total, 10.5);
        assert!(sum_energy(&[]) == 0.0);
    }

    #[test]
    fn test_hourly_totals_match_checks_both_metrics() {
        let mut steps = HourlyTotals::<u64>::default();
        steps.set(7, 500);
        let mut energy = HourlyTotals::<f64>::default();
        energy.set(7, 0.1);
        energy.set(8, 0.2);

        let day = WindowTotals {
            steps: 500,
            energy_kcal: 0.3,
        };
        assert!(hourly_totals_match(&day, &steps, &energy));

        let energy_drifted = WindowTotals {
            steps: 500,
            energy_kcal: 12.0,
        };
        assert!(!hourly_totals_match(&energy_drifted, &steps, &energy));

        let steps_drifted = WindowTotals {
            steps: 400,
            energy_kcal: 0.3,
        };
        assert!(!hourly_totals_match(&steps_drifted, &steps, &energy));
    }

    #[tokio::test]
    async fn test_single_record_lands_in_its_hour() {
        // 12:10Z is 07:10 at UTC-05:00
        let provider = InMemoryProvider::new()
            .with_record(MetricKind::Steps, ActivityRecord::steps(utc(12, 10), utc(12, 20), 500));
        let aggregator = DailyAggregator::with_config(provider, config(-300, FetchMode::Concurrent));

        let result = aggregator.aggregate(date()).await.unwrap();

        assert_eq!(result.total_steps, 500);
        for (hour, steps) in result.steps_by_hour.iter() {
            assert_eq!(steps, if hour == 7 { 500 } else { 0 });
        }
        assert_eq!(result.total_energy_kcal, 0.0);
    }

    #[tokio::test]
    async fn test_hourly_totals_partition_the_day() {
        let mut provider = InMemoryProvider::new();
        let day_start = Utc.with_ymd_and_hms(2024, 1, 14, 18, 30, 0).unwrap();
        for i in 0..96i64 {
            let start = day_start + Duration::minutes(i * 15);
            provider.extend(
                MetricKind::Steps,
                [ActivityRecord::steps(start, start + Duration::minutes(5), 10 + i)],
            );
            provider.extend(
                MetricKind::TotalCaloriesBurned,
                [ActivityRecord::energy(start, start + Duration::minutes(5), 1.25 * i as f64)],
            );
        }
        // Last millisecond of the local day and first of the next
        let last = day_start + Duration::days(1) - Duration::milliseconds(1);
        provider.extend(MetricKind::Steps, [ActivityRecord::steps(last, last, 7)]);
        let next = last + Duration::milliseconds(1);
        provider.extend(MetricKind::Steps, [ActivityRecord::steps(next, next, 1000)]);

        let aggregator = DailyAggregator::with_config(provider, config(330, FetchMode::Concurrent));
        let result = aggregator.aggregate(date()).await.unwrap();

        let expected_steps: u64 = (0..96u64).map(|i| 10 + i).sum::<u64>() + 7;
        assert_eq!(result.total_steps, expected_steps);
        assert_eq!(result.steps_by_hour.total(), result.total_steps);
        assert_eq!(result.steps_by_hour.get(23), (92..96u64).map(|i| 10 + i).sum::<u64>() + 7);
        assert!((result.energy_by_hour.total() - result.total_energy_kcal).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_issues_fifty_reads() {
        for mode in [FetchMode::Concurrent, FetchMode::Sequential] {
            let provider = CountingProvider::new(InMemoryProvider::new());
            let aggregator = DailyAggregator::with_config(provider, config(0, mode));

            aggregator.aggregate(date()).await.unwrap();

            assert_eq!(aggregator.provider().reads.load(Ordering::SeqCst), 50);
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_the_day() {
        let mut provider = CountingProvider::new(InMemoryProvider::new().with_record(
            MetricKind::Steps,
            ActivityRecord::steps(utc(9, 0), utc(9, 5), 300),
        ));
        provider.fail_hour_start = Some(utc(9, 0));
        let aggregator = DailyAggregator::with_config(provider, config(0, FetchMode::Sequential));

        let err = aggregator.aggregate(date()).await.unwrap_err();

        match err {
            ActivityError::FetchFailed { metric, window, .. } => {
                assert_eq!(metric, MetricKind::TotalCaloriesBurned);
                assert_eq!(window.start, utc(9, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Sequential mode stops at the failing hour: 2 day reads + 9 full hours + 2 reads of hour 9
        assert_eq!(aggregator.provider().reads.load(Ordering::SeqCst), 2 + 9 * 2 + 2);
    }

    #[tokio::test]
    async fn test_unavailable_provider_fails_before_reads() {
        let provider = CountingProvider::new(InMemoryProvider::new().unavailable());
        let aggregator = DailyAggregator::new(provider);

        let err = aggregator.aggregate(date()).await.unwrap_err();

        assert!(matches!(err, ActivityError::ProviderInitFailed));
        assert_eq!(aggregator.provider().reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_permission_fails_before_reads() {
        let provider =
            CountingProvider::new(InMemoryProvider::new().with_granted(&[MetricKind::Steps]));
        let aggregator = DailyAggregator::new(provider);

        let err = aggregator.aggregate(date()).await.unwrap_err();

        match err {
            ActivityError::PermissionDenied(missing) => {
                assert_eq!(missing, vec![MetricKind::TotalCaloriesBurned]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(aggregator.provider().reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_metric_reported() {
        let provider = InMemoryProvider::new().failing_reads(MetricKind::Steps);
        let aggregator = DailyAggregator::with_config(provider, config(0, FetchMode::Concurrent));

        let err = aggregator.aggregate(date()).await.unwrap_err();
        assert!(matches!(
            err,
            ActivityError::FetchFailed {
                metric: MetricKind::Steps,
                source: ProviderError::Io(_),
                ..
            }
        ));
    }
}
