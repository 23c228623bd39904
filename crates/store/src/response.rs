//! Bulk request results

use crate::OpKind;
use std::time::Duration;

/// Outcome of one operation within a bulk request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResponse {
    pub kind: OpKind,
    pub collection: String,
    /// Document id, store-assigned when the operation had none
    pub id: String,
    /// Failure message, `None` on success
    pub failure: Option<String>,
}

impl BulkItemResponse {
    pub fn success(kind: OpKind, collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind,
            collection: collection.into(),
            id: id.into(),
            failure: None,
        }
    }

    pub fn failure(
        kind: OpKind,
        collection: impl Into<String>,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            collection: collection.into(),
            id: id.into(),
            failure: Some(message.into()),
        }
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Result of a bulk request that reached the store
///
/// Individual operations may still have failed; see [`BulkResponse::failures`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    pub items: Vec<BulkItemResponse>,
    pub took: Duration,
}

impl BulkResponse {
    pub fn new(items: Vec<BulkItemResponse>, took: Duration) -> Self {
        Self { items, took }
    }

    pub fn has_failures(&self) -> bool {
        self.items.iter().any(BulkItemResponse::is_failed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &BulkItemResponse> {
        self.items.iter().filter(|item| item.is_failed())
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    pub fn succeeded_count(&self) -> usize {
        self.items.len() - self.failed_count()
    }

    /// Short summary of the failures for logging
    pub fn failure_message(&self) -> Option<String> {
        let mut failures = self.failures();
        let first = failures.next()?;
        let rest = failures.count();

        let message = format!(
            "[{}] {} {}: {}",
            first.collection,
            first.kind,
            first.id,
            first.failure.as_deref().unwrap_or_default()
        );

        Some(if rest == 0 {
            message
        } else {
            format!("{} (and {} more)", message, rest)
        })
    }
}
