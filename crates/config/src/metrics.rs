//! Metrics reporting configuration
//!
//! # Defaults
//!
//! - `enabled`: true
//! - `interval`: 10s between reports
//! - `tick_interval`: 5s between EWMA decay ticks
//! - `format`: human

use serde::Deserialize;
use std::time::Duration;

/// Default reporting interval
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Default EWMA tick interval
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Metrics output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON structured output
    Json,
}

/// Metrics configuration
///
/// # Example
///
/// ```toml
/// [metrics]
/// enabled = true
/// interval = "10s"
/// tick_interval = "5s"
/// format = "json"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable periodic reporting of ingest metrics
    /// Default: true
    pub enabled: bool,

    /// Reporting interval
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Interval at which meters decay their moving averages
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Output format (human, json)
    /// Default: human
    pub format: MetricsFormat,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_REPORT_INTERVAL,
            tick_interval: DEFAULT_TICK_INTERVAL,
            format: MetricsFormat::Human,
        }
    }
}
