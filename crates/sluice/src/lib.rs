//! Sluice
//!
//! Client-side admission control and retention for bulk writes into a
//! document store.
//!
//! # Overview
//!
//! [`IngestClient`] wires the workspace crates together:
//!
//! - [`sluice_bulk`]: batching, bounded concurrency and fail-fast dispatch
//! - [`sluice_metrics`]: counters and 1/5/15-minute rates per processor
//! - [`sluice_retention`]: alias rotation and pruning of old rotations
//! - [`sluice_store`]: the write model and the collaborator traits a store
//!   client implements
//! - [`sluice_pipeline`]: listener-driven request pipelines for producers
//!
//! # Example
//!
//! ```ignore
//! let config = Config::from_file("sluice.toml")?;
//! sluice::init_logging(&config.log)?;
//!
//! let client = IngestClient::new(config, sink, admin)?;
//! client.index("logs-10", "42", payload).await?;
//! client.flush_ingest().await?;
//! client.wait_for_responses(Duration::from_secs(30)).await;
//! client.update_aliases("logs", "logs-10").await?;
//! client.shutdown().await;
//! ```

mod client;
mod error;
mod logging;

pub use client::IngestClient;
pub use error::{ClientError, Result};
pub use logging::init_logging;

pub use sluice_bulk::{BulkError, BulkEvent, BulkOutcome, BulkProcessor};
pub use sluice_config::Config;
pub use sluice_metrics::{IngestMetric, IngestSnapshot, MeterMetric};
pub use sluice_retention::{AliasUpdate, RetentionOutcome, RetentionPolicy};
pub use sluice_store::{BulkSink, IndexAdmin, MemoryStore, OpKind, Operation, StoreError};

pub use sluice_bulk;
pub use sluice_config;
pub use sluice_metrics;
pub use sluice_pipeline;
pub use sluice_retention;
pub use sluice_store;
