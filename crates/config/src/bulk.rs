//! Bulk processor settings
//!
//! Bounds for batching and admission control. All fields have defaults
//! that suit a single producer writing to a modest cluster.

use serde::Deserialize;
use std::time::Duration;

/// Default maximum operations per batch
pub const DEFAULT_MAX_ACTIONS: usize = 1000;

/// Default maximum estimated bytes per batch (10 MiB)
pub const DEFAULT_MAX_VOLUME: u64 = 10 * 1024 * 1024;

/// Default interval of the background flush timer
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Default bound on how long `close()` waits for in-flight batches
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on `max_concurrent_requests`, the permit limit of a tokio semaphore
pub const MAX_CONCURRENT_REQUESTS: usize = usize::MAX >> 3;

/// Bulk processor configuration
///
/// Constructed once and handed to the processor; a running processor
/// never sees its bounds change.
///
/// # Example
///
/// ```toml
/// [bulk]
/// max_actions = 1000
/// max_volume = 10485760
/// max_concurrent_requests = 16
/// flush_interval = "30s"
/// close_timeout = "30s"
/// ignore_errors = false
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BulkConfig {
    /// Maximum operations in a single batch
    /// Default: 1000
    pub max_actions: usize,

    /// Maximum estimated bytes in a single batch
    /// Default: 10 MiB
    pub max_volume: u64,

    /// Maximum batches in flight against the store
    /// Default: available CPUs * 4
    pub max_concurrent_requests: usize,

    /// Interval of the background flush timer, `0s` disables it
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,

    /// How long `close()` waits for outstanding batches
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub close_timeout: Duration,

    /// Keep accepting operations after a failed batch
    /// Default: false
    pub ignore_errors: bool,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_actions: DEFAULT_MAX_ACTIONS,
            max_volume: DEFAULT_MAX_VOLUME,
            max_concurrent_requests: num_cpus() * 4,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            ignore_errors: false,
        }
    }
}

impl BulkConfig {
    /// Set the maximum operations per batch
    pub fn with_max_actions(mut self, max_actions: usize) -> Self {
        self.max_actions = max_actions;
        self
    }

    /// Set the maximum estimated bytes per batch
    pub fn with_max_volume(mut self, max_volume: u64) -> Self {
        self.max_volume = max_volume;
        self
    }

    /// Set the maximum number of batches in flight
    pub fn with_max_concurrent_requests(mut self, max_concurrent_requests: usize) -> Self {
        self.max_concurrent_requests = max_concurrent_requests;
        self
    }

    /// Set the flush timer interval (`Duration::ZERO` disables the timer)
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Set the close timeout
    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    /// Keep accepting operations after a failed batch
    pub fn with_ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }

    /// Whether the background flush timer runs at all
    pub fn flush_timer_enabled(&self) -> bool {
        !self.flush_interval.is_zero()
    }
}

/// Get the number of available CPUs, defaulting to 4 if detection fails
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BulkConfig::default();
        assert_eq!(config.max_actions, 1000);
        assert_eq!(config.max_volume, 10 * 1024 * 1024);
        assert!(config.max_concurrent_requests >= 4);
        assert_eq!(config.max_concurrent_requests % 4, 0);
        assert_eq!(config.flush_interval, Duration::from_secs(30));
        assert!(!config.ignore_errors);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
max_actions = 250
flush_interval = "5s"
"#;
        let config: BulkConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_actions, 250);
        assert_eq!(config.flush_interval, Duration::from_secs(5));
        // Defaults still apply
        assert_eq!(config.max_volume, DEFAULT_MAX_VOLUME);
        assert_eq!(config.close_timeout, DEFAULT_CLOSE_TIMEOUT);
    }

    #[test]
    fn test_zero_interval_disables_timer() {
        let config: BulkConfig = toml::from_str("flush_interval = \"0s\"").unwrap();
        assert!(!config.flush_timer_enabled());
        assert!(BulkConfig::default().flush_timer_enabled());
    }

    #[test]
    fn test_builder_methods() {
        let config = BulkConfig::default()
            .with_max_actions(3)
            .with_max_volume(1024)
            .with_max_concurrent_requests(1)
            .with_ignore_errors(true);
        assert_eq!(config.max_actions, 3);
        assert_eq!(config.max_volume, 1024);
        assert_eq!(config.max_concurrent_requests, 1);
        assert!(config.ignore_errors);
    }
}
