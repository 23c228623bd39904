//! Client error types

use sluice_bulk::BulkError;
use sluice_config::ConfigError;
use sluice_pipeline::PipelineError;
use sluice_retention::RetentionError;
use sluice_store::StoreError;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by [`IngestClient`](crate::IngestClient)
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bulk(#[from] BulkError),

    /// An admin request failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Retention(#[from] RetentionError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The tracing subscriber could not be installed
    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl ClientError {
    pub fn logging(msg: impl Into<String>) -> Self {
        Self::Logging(msg.into())
    }

    /// Whether the processor behind the client is closed
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Bulk(e) if e.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err: ClientError = BulkError::Closed.into();
        assert!(err.is_closed());

        let err: ClientError = StoreError::collection_not_found("logs-1").into();
        assert!(!err.is_closed());
        assert!(err.to_string().contains("logs-1"));

        let err = ClientError::logging("already installed");
        assert_eq!(err.to_string(), "logging setup failed: already installed");
    }
}
