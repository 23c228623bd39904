//! Sluice - Bulk
//!
//! Admission control in front of a document store's bulk write API.
//!
//! # Overview
//!
//! Producers call [`BulkProcessor::add`]. Operations accumulate into a
//! batch that is handed to the [`BulkSink`](sluice_store::BulkSink) when
//! it reaches `max_actions` operations or `max_volume` estimated bytes,
//! when the flush timer fires, or on `flush()`/`close()`.
//!
//! At most `max_concurrent_requests` batches are in flight. Beyond that,
//! `add()` waits for a permit: producers slow down to the store's pace
//! instead of queueing without bound.
//!
//! # Failure Policy
//!
//! - malformed operation: `Err(BulkError::Validation)` from `add()`
//! - items failed inside an answered batch: counted in `failed`, logged
//! - request failed as a whole: counted, stored as `throwable()`, and the
//!   processor is disabled; later `add()` calls are silent no-ops
//!
//! Nothing is retried.
//!
//! # Example
//!
//! ```ignore
//! let processor = BulkProcessor::builder(store.clone())
//!     .admin(store)
//!     .config(config.bulk.clone())
//!     .build()?;
//!
//! processor.add(Operation::index("logs-10", payload)).await?;
//! processor.flush().await?;
//! processor.wait_for_completion(Duration::from_secs(30)).await;
//! processor.close().await;
//! ```

mod error;
mod event;
mod failure_log;
mod processor;

pub use error::{BulkError, Result};
pub use event::{BulkEvent, BulkOutcome};
pub use processor::{BulkProcessor, BulkProcessorBuilder, DEFAULT_EVENT_CAPACITY};
