//! Sluice - Store
//!
//! The write model and the document-store boundary.
//!
//! # Overview
//!
//! - [`Operation`] / [`Batch`]: what producers submit and what the bulk
//!   processor hands to the store
//! - [`BulkResponse`]: per-operation results of one bulk request
//! - [`BulkSink`] / [`IndexAdmin`]: the store client, injected as trait
//!   objects
//! - [`MemoryStore`]: an in-process implementation of both traits
//!
//! The wire protocol of any concrete store lives outside this workspace;
//! a client adapts it by implementing the two traits.

mod error;
mod memory;
mod operation;
mod response;
mod traits;

pub use error::{InvalidOperation, Result, StoreError};
pub use memory::{BatchRecord, DEFAULT_REFRESH_INTERVAL, MemoryStore};
pub use operation::{Batch, OpKind, Operation, REQUEST_OVERHEAD};
pub use response::{BulkItemResponse, BulkResponse};
pub use traits::{AliasAction, BulkSink, IndexAdmin, matches_pattern};
