//! Bulk processor error types

use sluice_config::ConfigError;
use sluice_store::{InvalidOperation, StoreError};
use std::time::Duration;
use thiserror::Error;

/// Result type for bulk processor operations
pub type Result<T> = std::result::Result<T, BulkError>;

/// Errors raised synchronously by the bulk processor
///
/// Batch failures are not among them: those are recorded on the processor
/// (`throwable()`) and broadcast as events.
#[derive(Debug, Error)]
pub enum BulkError {
    /// The processor was closed
    #[error("bulk processor is closed")]
    Closed,

    /// Malformed operation rejected at `add()`
    #[error("invalid operation: {0}")]
    Validation(#[from] InvalidOperation),

    /// Bulk mode was requested but no admin client was configured
    #[error("bulk mode requires an index admin client")]
    AdminUnavailable,

    /// Outstanding batches did not drain in time
    #[error("timed out after {0:?} waiting for outstanding batches")]
    Timeout(Duration),

    /// The processor needs a tokio runtime for its background tasks
    #[error("bulk processor must be built inside a tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An admin request failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BulkError {
    /// Whether this is the closed-processor error
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
