//! Pipeline error types

use std::time::Duration;
use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The runner was cancelled before `call()`
    #[error("pipeline cancelled before it started")]
    Cancelled,

    /// `call()` or `execute()` was invoked a second time
    #[error("pipeline already run")]
    AlreadyRun,

    /// A listener reported a fatal error
    #[error("pipeline aborted after {requests} requests: {reason}")]
    Aborted { requests: u64, reason: String },

    /// Executor tasks did not finish in time; they keep running
    #[error("pipelines still running after {0:?}")]
    Timeout(Duration),

    /// An executor task panicked or was cancelled
    #[error("pipeline task failed: {0}")]
    TaskFailed(String),

    /// `execute()` was called outside a tokio runtime
    #[error("no tokio runtime available")]
    NoRuntime,
}

impl PipelineError {
    pub fn aborted(requests: u64, reason: impl Into<String>) -> Self {
        Self::Aborted {
            requests,
            reason: reason.into(),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
