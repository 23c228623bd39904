//! Collaborator interfaces
//!
//! The store's own client is injected behind these traits. [`BulkSink`]
//! is the write path used by the bulk processor; [`IndexAdmin`] is the
//! administrative path used by bulk mode and the retention policy.

use crate::{Batch, BulkResponse, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// One step of an atomic alias update
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AliasAction {
    Add { alias: String, collection: String },
    Remove { alias: String, collection: String },
}

impl AliasAction {
    pub fn add(alias: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::Add {
            alias: alias.into(),
            collection: collection.into(),
        }
    }

    pub fn remove(alias: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::Remove {
            alias: alias.into(),
            collection: collection.into(),
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            Self::Add { alias, .. } | Self::Remove { alias, .. } => alias,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            Self::Add { collection, .. } | Self::Remove { collection, .. } => collection,
        }
    }
}

/// Write endpoint that executes a batch
///
/// The sink takes ownership of the batch. A returned `Err` means the
/// request as a whole failed; per-operation failures are reported inside
/// the `BulkResponse`.
#[async_trait]
pub trait BulkSink: Send + Sync {
    async fn submit_batch(&self, batch: Batch) -> Result<BulkResponse>;
}

/// Administrative interface of the document store
#[async_trait]
pub trait IndexAdmin: Send + Sync {
    /// Collections holding an alias matching `pattern`, mapped to the
    /// matching alias names. `*` matches any run of characters.
    async fn get_aliases(&self, pattern: &str) -> Result<BTreeMap<String, BTreeSet<String>>>;

    /// Apply all actions atomically, returning whether the store acknowledged
    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<bool>;

    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Delete all named collections in one request
    async fn delete_collections(&self, names: &[String]) -> Result<bool>;

    /// Set the refresh interval, `None` disables periodic refresh
    async fn set_refresh_interval(&self, collection: &str, interval: Option<Duration>)
    -> Result<()>;

    async fn set_replica_count(&self, collection: &str, replicas: u32) -> Result<()>;

    async fn create_collection(&self, name: &str) -> Result<()>;

    /// Make recent writes visible to readers
    async fn refresh(&self, collection: &str) -> Result<()>;
}

/// Match `name` against a pattern where `*` matches any run of characters
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return name.is_empty();
    };
    let Some(mut rest) = name.strip_prefix(first) else {
        return false;
    };

    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        // no wildcard at all
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }

    rest.len() >= last.len() && rest.ends_with(last)
}
