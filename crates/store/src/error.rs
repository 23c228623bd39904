//! Store error types

use std::time::Duration;
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors reported by a document store collaborator
///
/// Clone so that a failure can be both stored as the processor's cause
/// and broadcast to event subscribers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No node or endpoint reachable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The whole request was rejected
    #[error("request rejected: {0}")]
    Rejected(String),

    /// A named collection does not exist
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The store did not answer in time
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound(name.into())
    }
}

/// Malformed operation, rejected before it reaches a batch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidOperation {
    #[error("operation has no target collection")]
    MissingCollection,

    #[error("{0} operation requires a document id")]
    MissingId(crate::OpKind),

    #[error("{0} operation requires a payload")]
    MissingPayload(crate::OpKind),

    /// The operation alone exceeds the per-batch volume bound
    #[error("operation of {size} bytes exceeds max batch volume of {max} bytes")]
    TooLarge { size: u64, max: u64 },
}
