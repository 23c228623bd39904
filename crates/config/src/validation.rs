//! Configuration validation
//!
//! Rejects bounds the bulk processor cannot honour:
//! - zero batch size or volume
//! - zero concurrency, or more than a semaphore can hold
//! - zero metrics tick or report interval
//! - an empty secondary alias

use crate::Config;
use crate::bulk::MAX_CONCURRENT_REQUESTS;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_bulk(config)?;
    validate_retention(config)?;
    validate_metrics(config)?;
    Ok(())
}

fn validate_bulk(config: &Config) -> Result<()> {
    let bulk = &config.bulk;

    if bulk.max_actions == 0 {
        return Err(ConfigError::invalid_value(
            "bulk",
            "max_actions",
            "must be at least 1",
        ));
    }

    if bulk.max_volume == 0 {
        return Err(ConfigError::invalid_value(
            "bulk",
            "max_volume",
            "must be at least 1 byte",
        ));
    }

    if bulk.max_concurrent_requests == 0 {
        return Err(ConfigError::invalid_value(
            "bulk",
            "max_concurrent_requests",
            "must be at least 1",
        ));
    }

    if bulk.max_concurrent_requests > MAX_CONCURRENT_REQUESTS {
        return Err(ConfigError::invalid_value(
            "bulk",
            "max_concurrent_requests",
            format!("must be at most {MAX_CONCURRENT_REQUESTS}"),
        ));
    }

    Ok(())
}

fn validate_retention(config: &Config) -> Result<()> {
    if let Some(ref identifier) = config.retention.identifier
        && identifier.trim().is_empty()
    {
        return Err(ConfigError::invalid_value(
            "retention",
            "identifier",
            "must not be empty when set",
        ));
    }

    Ok(())
}

fn validate_metrics(config: &Config) -> Result<()> {
    if config.metrics.tick_interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "metrics",
            "tick_interval",
            "must be greater than zero",
        ));
    }

    if config.metrics.enabled && config.metrics.interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "metrics",
            "interval",
            "must be greater than zero when metrics are enabled",
        ));
    }

    Ok(())
}
