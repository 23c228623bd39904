//! Retention policy settings
//!
//! Controls alias rotation and pruning of time-rotated collections.

use serde::Deserialize;

/// Default maximum ordinal distance before a collection may be deleted
pub const DEFAULT_RETENTION_DIFF: i64 = 48;

/// Default number of older collections always kept
pub const DEFAULT_RETENTION_MIN_TO_KEEP: i64 = 2;

/// Retention configuration
///
/// # Example
///
/// ```toml
/// [retention]
/// enabled = true
/// diff = 48
/// mintokeep = 2
/// identifier = "logs-current"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetentionConfig {
    /// Run the deletion pass after every alias update
    /// Default: false
    pub enabled: bool,

    /// Maximum age in ordinal units (`<= 0` disables deletion)
    /// Default: 48
    pub diff: i64,

    /// Keep at least this many older collections (`<= 0` disables the floor)
    /// Default: 2
    #[serde(rename = "mintokeep", alias = "min_to_keep")]
    pub min_to_keep: i64,

    /// Secondary alias moved together with the main alias
    /// Default: none
    pub identifier: Option<String>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            diff: DEFAULT_RETENTION_DIFF,
            min_to_keep: DEFAULT_RETENTION_MIN_TO_KEEP,
            identifier: None,
        }
    }
}

impl RetentionConfig {
    /// Enable or disable the deletion pass
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the retention window
    pub fn with_diff(mut self, diff: i64) -> Self {
        self.diff = diff;
        self
    }

    /// Set the keep floor
    pub fn with_min_to_keep(mut self, min_to_keep: i64) -> Self {
        self.min_to_keep = min_to_keep;
        self
    }

    /// Set the secondary alias
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RetentionConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.diff, 48);
        assert_eq!(config.min_to_keep, 2);
        assert!(config.identifier.is_none());
    }

    #[test]
    fn test_deserialize_mintokeep_key() {
        let toml = r#"
enabled = true
diff = 3
mintokeep = 5
"#;
        let config: RetentionConfig = toml::from_str(toml).unwrap();
        assert!(config.enabled);
        assert_eq!(config.diff, 3);
        assert_eq!(config.min_to_keep, 5);
    }

    #[test]
    fn test_deserialize_snake_case_alias() {
        let config: RetentionConfig = toml::from_str("min_to_keep = 0").unwrap();
        assert_eq!(config.min_to_keep, 0);
    }

    #[test]
    fn test_deserialize_identifier() {
        let config: RetentionConfig = toml::from_str("identifier = \"current\"").unwrap();
        assert_eq!(config.identifier.as_deref(), Some("current"));
    }
}
