//! Write operations and batches
//!
//! An [`Operation`] is immutable once built; its size estimate is fixed at
//! construction so the processor can account for it without re-measuring.

use crate::InvalidOperation;
use bytes::Bytes;
use serde::Serialize;
use std::fmt;

/// Fixed per-operation overhead added to every size estimate
pub const REQUEST_OVERHEAD: u64 = 50;

/// Kind of write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    /// Write only if the id does not exist yet
    Create,
    /// Insert or overwrite
    Index,
    Delete,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Index => "index",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    kind: OpKind,
    collection: String,
    id: Option<String>,
    payload: Bytes,
    estimated_size: u64,
}

impl Operation {
    /// Build an operation; an empty id is treated as "let the store assign one"
    pub fn new(
        kind: OpKind,
        collection: impl Into<String>,
        id: Option<String>,
        payload: Bytes,
    ) -> Self {
        let collection = collection.into();
        let id = id.filter(|id| !id.is_empty());
        let estimated_size = REQUEST_OVERHEAD
            + collection.len() as u64
            + id.as_ref().map_or(0, |id| id.len() as u64)
            + payload.len() as u64;

        Self {
            kind,
            collection,
            id,
            payload,
            estimated_size,
        }
    }

    pub fn create(collection: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self::new(OpKind::Create, collection, None, payload.into())
    }

    pub fn index(collection: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self::new(OpKind::Index, collection, None, payload.into())
    }

    pub fn delete(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(OpKind::Delete, collection, Some(id.into()), Bytes::new())
    }

    /// Same operation targeting an explicit document id
    pub fn with_id(self, id: impl Into<String>) -> Self {
        Self::new(self.kind, self.collection, Some(id.into()), self.payload)
    }

    #[inline]
    pub fn kind(&self) -> OpKind {
        self.kind
    }

    #[inline]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Estimated request bytes for this operation
    #[inline]
    pub fn estimated_size(&self) -> u64 {
        self.estimated_size
    }

    /// Check the operation is well-formed
    pub fn validate(&self) -> Result<(), InvalidOperation> {
        if self.collection.trim().is_empty() {
            return Err(InvalidOperation::MissingCollection);
        }

        match self.kind {
            OpKind::Delete if self.id.is_none() => Err(InvalidOperation::MissingId(self.kind)),
            OpKind::Create | OpKind::Index if self.payload.is_empty() => {
                Err(InvalidOperation::MissingPayload(self.kind))
            }
            _ => Ok(()),
        }
    }
}

/// Ordered group of operations handed to a sink in one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    operations: Vec<Operation>,
    estimated_bytes: u64,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            operations: Vec::with_capacity(capacity),
            estimated_bytes: 0,
        }
    }

    /// Append an operation, keeping submission order
    pub fn push(&mut self, operation: Operation) {
        self.estimated_bytes += operation.estimated_size();
        self.operations.push(operation);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Sum of the operations' estimated sizes
    #[inline]
    pub fn estimated_bytes(&self) -> u64 {
        self.estimated_bytes
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    /// Swap out the accumulated operations, leaving an empty batch behind
    pub fn take(&mut self) -> Batch {
        std::mem::take(self)
    }
}

impl FromIterator<Operation> for Batch {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        let mut batch = Batch::new();
        for operation in iter {
            batch.push(operation);
        }
        batch
    }
}
