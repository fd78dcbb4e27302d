//! Error types for Synheart Activity

use crate::types::{MetricKind, TimeWindow};
use thiserror::Error;

/// Errors reported by a health data provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Provider is not initialized")]
    NotInitialized,

    #[error("Permission not granted for {0}")]
    PermissionDenied(MetricKind),

    #[error("Provider I/O failure: {0}")]
    Io(String),
}

/// Errors that can occur while aggregating a day of activity
#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("Health data provider failed to initialize")]
    ProviderInitFailed,

    #[error("Read permission denied for: {}", .0.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", "))]
    PermissionDenied(Vec<MetricKind>),

    #[error("Failed to read {metric} records for {window}: {source}")]
    FetchFailed {
        metric: MetricKind,
        window: TimeWindow,
        #[source]
        source: ProviderError,
    },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),
}
