//! Sluice Configuration
//!
//! TOML-based configuration with defaults for every field. An empty
//! document is a valid configuration.
//!
//! # Parsing
//!
//! ```
//! use sluice_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[bulk]\nmax_actions = 500").unwrap();
//! assert_eq!(config.bulk.max_actions, 500);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [bulk]
//! max_actions = 1000
//! max_volume = 10485760
//! max_concurrent_requests = 8
//! flush_interval = "30s"
//!
//! [retention]
//! enabled = true
//! diff = 48
//! mintokeep = 2
//!
//! [log]
//! level = "info"
//!
//! [metrics]
//! interval = "10s"
//! ```

mod bulk;
mod error;
mod logging;
mod metrics;
mod retention;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use bulk::{
    BulkConfig, DEFAULT_CLOSE_TIMEOUT, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_ACTIONS,
    DEFAULT_MAX_VOLUME, MAX_CONCURRENT_REQUESTS,
};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use metrics::{DEFAULT_REPORT_INTERVAL, DEFAULT_TICK_INTERVAL, MetricsConfig, MetricsFormat};
pub use retention::{DEFAULT_RETENTION_DIFF, DEFAULT_RETENTION_MIN_TO_KEEP, RetentionConfig};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Batching and admission control
    pub bulk: BulkConfig,

    /// Alias rotation and collection pruning
    pub retention: RetentionConfig,

    /// Logging configuration
    pub log: LogConfig,

    /// Metrics reporting configuration
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML,
    /// or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Configurations assembled in code should be checked with this before
    /// being handed to a processor.
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
[bulk]
max_actions = 3
max_volume = 2048
max_concurrent_requests = 2
flush_interval = "1s"
ignore_errors = true

[retention]
enabled = true
diff = 3
mintokeep = 2
identifier = "logs-current"

[log]
level = "debug"

[metrics]
enabled = false
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.bulk.max_actions, 3);
        assert_eq!(config.bulk.max_volume, 2048);
        assert_eq!(config.bulk.max_concurrent_requests, 2);
        assert_eq!(config.bulk.flush_interval, Duration::from_secs(1));
        assert!(config.bulk.ignore_errors);
        assert!(config.retention.enabled);
        assert_eq!(config.retention.identifier.as_deref(), Some("logs-current"));
        assert_eq!(config.log.level, LogLevel::Debug);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("[bulk\nmax_actions = 1");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bulk]\nmax_actions = 42").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.bulk.max_actions, 42);
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}
