//! Retention error types

use sluice_store::StoreError;
use thiserror::Error;

/// Result type for alias updates
pub type Result<T> = std::result::Result<T, RetentionError>;

/// Errors from alias updates
///
/// The deletion pass never fails its caller; its problems are reported in
/// the returned [`RetentionOutcome`](crate::RetentionOutcome) instead.
#[derive(Debug, Error)]
pub enum RetentionError {
    /// Looking up or switching aliases failed
    #[error("alias update failed: {0}")]
    Store(#[from] StoreError),
}
