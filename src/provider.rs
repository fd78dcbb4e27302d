//! Health data provider capability
//!
//! The platform health store is an external collaborator. This module defines
//! the capability the aggregator consumes, and an in-memory provider backed by
//! a JSON record export.

use crate::error::{ActivityError, ProviderError};
use crate::types::{ActivityRecord, MetricKind, Permission, TimeWindow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

/// Trait for platform health data providers
#[async_trait]
pub trait HealthDataProvider: Send + Sync {
    /// Initialize the provider. Returns `false` if the store is unavailable.
    async fn initialize(&self) -> Result<bool, ProviderError>;

    /// Request permissions and return the subset that was granted
    async fn request_permission(
        &self,
        permissions: &[Permission],
    ) -> Result<Vec<Permission>, ProviderError>;

    /// Read all records of `metric` whose timestamps fall within `window` (inclusive)
    async fn read_records(
        &self,
        metric: MetricKind,
        window: &TimeWindow,
    ) -> Result<Vec<ActivityRecord>, ProviderError>;
}

/// Record export grouped by record type
#[derive(Debug, Default, Deserialize)]
struct RecordExport {
    #[serde(rename = "Steps", default)]
    steps: Vec<ActivityRecord>,
    #[serde(rename = "TotalCaloriesBurned", default)]
    calories: Vec<ActivityRecord>,
}

/// Provider serving records from memory.
///
/// Records are matched to a window by `start_time`, both bounds inclusive.
#[derive(Debug)]
pub struct InMemoryProvider {
    records: BTreeMap<MetricKind, Vec<ActivityRecord>>,
    granted: HashSet<MetricKind>,
    available: bool,
    initialized: AtomicBool,
    failing: HashSet<MetricKind>,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProvider {
    /// Create an empty provider that grants read access to every metric
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            granted: MetricKind::ALL.into_iter().collect(),
            available: true,
            initialized: AtomicBool::new(false),
            failing: HashSet::new(),
        }
    }

    /// Parse a JSON export of the form `{"Steps": [...], "TotalCaloriesBurned": [...]}`
    pub fn from_json(json: &str) -> Result<Self, ActivityError> {
        let export: RecordExport = serde_json::from_str(json)?;
        let mut provider = Self::new();
        provider.extend(MetricKind::Steps, export.steps);
        provider.extend(MetricKind::TotalCaloriesBurned, export.calories);
        Ok(provider)
    }

    /// Add a record of the given metric
    pub fn with_record(mut self, metric: MetricKind, record: ActivityRecord) -> Self {
        self.extend(metric, std::iter::once(record));
        self
    }

    /// Restrict the permissions the provider will grant
    pub fn with_granted(mut self, granted: &[MetricKind]) -> Self {
        self.granted = granted.iter().copied().collect();
        self
    }

    /// Make `initialize` report the store as unavailable
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Make every read of `metric` fail with an I/O error
    pub fn failing_reads(mut self, metric: MetricKind) -> Self {
        self.failing.insert(metric);
        self
    }

    pub fn extend(&mut self, metric: MetricKind, records: impl IntoIterator<Item = ActivityRecord>) {
        self.records.entry(metric).or_default().extend(records);
    }

    /// Number of stored records of `metric`
    pub fn len(&self, metric: MetricKind) -> usize {
        self.records.get(&metric).map_or(0, Vec::len)
    }
}

#[async_trait]
impl HealthDataProvider for InMemoryProvider {
    async fn initialize(&self) -> Result<bool, ProviderError> {
        self.initialized.store(self.available, Ordering::SeqCst);
        Ok(self.available)
    }

    async fn request_permission(
        &self,
        permissions: &[Permission],
    ) -> Result<Vec<Permission>, ProviderError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(ProviderError::NotInitialized);
        }
        Ok(permissions
            .iter()
            .filter(|p| self.granted.contains(&p.record_type))
            .copied()
            .collect())
    }

    async fn read_records(
        &self,
        metric: MetricKind,
        window: &TimeWindow,
    ) -> Result<Vec<ActivityRecord>, ProviderError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(ProviderError::NotInitialized);
        }
        if !self.granted.contains(&metric) {
            return Err(ProviderError::PermissionDenied(metric));
        }
        if self.failing.contains(&metric) {
            return Err(ProviderError::Io(format!("{} store unreadable", metric)));
        }

        Ok(self
            .records
            .get(&metric)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| window.contains(r.start_time))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
