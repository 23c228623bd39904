//! Batch lifecycle events
//!
//! Every dispatched batch produces exactly one `Before` followed by exactly
//! one `After`, correlated by execution id. Events are delivered over a
//! broadcast channel, so a slow subscriber lags instead of stalling
//! dispatch.

use sluice_store::{BulkResponse, StoreError};
use std::sync::Arc;

/// How a dispatched batch ended
#[derive(Debug, Clone)]
pub enum BulkOutcome {
    /// The store answered; individual items may still have failed
    Success(Arc<BulkResponse>),
    /// The request as a whole failed
    Failure(StoreError),
}

impl BulkOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Lifecycle event for one batch
#[derive(Debug, Clone)]
pub enum BulkEvent {
    /// Emitted before the batch waits for a dispatch permit
    Before {
        execution_id: u64,
        actions: usize,
        bytes: u64,
    },
    /// Emitted when the sink has answered
    After {
        execution_id: u64,
        actions: usize,
        outcome: BulkOutcome,
    },
}

impl BulkEvent {
    pub fn execution_id(&self) -> u64 {
        match self {
            Self::Before { execution_id, .. } | Self::After { execution_id, .. } => *execution_id,
        }
    }
}
