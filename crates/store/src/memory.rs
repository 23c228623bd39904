//! In-process document store
//!
//! `MemoryStore` implements both collaborator traits against plain maps.
//! It backs the test suites and dry runs, so it also records what it was
//! asked to do and can be told to misbehave:
//!
//! - `with_delay`: every batch takes this long
//! - `with_failed_batch(n)`: the nth submitted batch (1-based) fails as a whole
//! - `with_failed_document(id)`: operations on this id fail individually
//! - `with_unacknowledged_deletes`: deletes are refused without error

use crate::{
    AliasAction, Batch, BulkItemResponse, BulkResponse, BulkSink, IndexAdmin, OpKind, Result,
    StoreError, matches_pattern,
};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Refresh interval a new collection starts with
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// What the store saw for one submitted batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRecord {
    /// 1-based submission sequence
    pub sequence: u64,
    pub operations: usize,
    pub estimated_bytes: u64,
}

#[derive(Debug)]
struct Collection {
    docs: HashMap<String, Bytes>,
    aliases: BTreeSet<String>,
    refresh_interval: Option<Duration>,
    replicas: u32,
}

impl Default for Collection {
    fn default() -> Self {
        Self {
            docs: HashMap::new(),
            aliases: BTreeSet::new(),
            refresh_interval: Some(DEFAULT_REFRESH_INTERVAL),
            replicas: 1,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    collections: BTreeMap<String, Collection>,
    batches: Vec<BatchRecord>,
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    delay: Duration,
    failed_batches: HashSet<u64>,
    failed_documents: HashSet<String>,
    refuse_deletes: bool,
    sequence: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Decrements the in-flight gauge when a batch finishes, however it finishes
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every batch take `delay` before it is applied
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the nth submitted batch (1-based) with a transport error
    pub fn with_failed_batch(mut self, sequence: u64) -> Self {
        self.failed_batches.insert(sequence);
        self
    }

    /// Reject every operation on this document id
    pub fn with_failed_document(mut self, id: impl Into<String>) -> Self {
        self.failed_documents.insert(id.into());
        self
    }

    /// Answer deletes with "not acknowledged" and keep the collections
    pub fn with_unacknowledged_deletes(mut self) -> Self {
        self.refuse_deletes = true;
        self
    }

    // =========================================================================
    // Setup and inspection
    // =========================================================================

    /// Create collections directly (test setup)
    pub fn add_collections<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock();
        for name in names {
            state.collections.entry(name.into()).or_default();
        }
    }

    /// Point an alias at a collection directly (test setup)
    pub fn add_alias(&self, alias: &str, collection: &str) {
        self.state
            .lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .aliases
            .insert(alias.to_string());
    }

    pub fn collections(&self) -> Vec<String> {
        self.state.lock().collections.keys().cloned().collect()
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.state.lock().collections.contains_key(name)
    }

    /// Collections the alias currently points to
    pub fn alias_targets(&self, alias: &str) -> Vec<String> {
        self.state
            .lock()
            .collections
            .iter()
            .filter(|(_, c)| c.aliases.contains(alias))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .collections
            .get(collection)
            .map_or(0, |c| c.docs.len())
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Bytes> {
        self.state
            .lock()
            .collections
            .get(collection)
            .and_then(|c| c.docs.get(id).cloned())
    }

    /// Refresh interval of a collection; outer `None` if it does not exist
    pub fn refresh_interval(&self, collection: &str) -> Option<Option<Duration>> {
        self.state
            .lock()
            .collections
            .get(collection)
            .map(|c| c.refresh_interval)
    }

    pub fn replica_count(&self, collection: &str) -> Option<u32> {
        self.state
            .lock()
            .collections
            .get(collection)
            .map(|c| c.replicas)
    }

    /// Every batch received, in submission order
    pub fn batches(&self) -> Vec<BatchRecord> {
        self.state.lock().batches.clone()
    }

    /// Highest number of batches that were executing at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn apply(&self, state: &mut State, batch: Batch) -> Vec<BulkItemResponse> {
        batch
            .into_operations()
            .into_iter()
            .map(|op| {
                let kind = op.kind();
                let name = op.collection().to_string();
                let id = op
                    .id()
                    .map(str::to_string)
                    .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

                if self.failed_documents.contains(&id) {
                    return BulkItemResponse::failure(kind, name, id, "rejected by store");
                }

                let collection = state.collections.entry(name.clone()).or_default();
                match kind {
                    OpKind::Create if collection.docs.contains_key(&id) => {
                        BulkItemResponse::failure(kind, name, id, "document already exists")
                    }
                    OpKind::Create | OpKind::Index => {
                        collection.docs.insert(id.clone(), op.payload().clone());
                        BulkItemResponse::success(kind, name, id)
                    }
                    OpKind::Delete => {
                        collection.docs.remove(&id);
                        BulkItemResponse::success(kind, name, id)
                    }
                }
            })
            .collect()
    }
}

#[async_trait]
impl BulkSink for MemoryStore {
    async fn submit_batch(&self, batch: Batch) -> Result<BulkResponse> {
        let started = Instant::now();
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        self.state.lock().batches.push(BatchRecord {
            sequence,
            operations: batch.len(),
            estimated_bytes: batch.estimated_bytes(),
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failed_batches.contains(&sequence) {
            return Err(StoreError::unavailable(format!(
                "no node available for batch #{}",
                sequence
            )));
        }

        let items = {
            let mut state = self.state.lock();
            self.apply(&mut state, batch)
        };

        Ok(BulkResponse::new(items, started.elapsed()))
    }
}

#[async_trait]
impl IndexAdmin for MemoryStore {
    async fn get_aliases(&self, pattern: &str) -> Result<BTreeMap<String, BTreeSet<String>>> {
        let state = self.state.lock();
        Ok(state
            .collections
            .iter()
            .filter_map(|(name, collection)| {
                let matching: BTreeSet<String> = collection
                    .aliases
                    .iter()
                    .filter(|alias| matches_pattern(pattern, alias))
                    .cloned()
                    .collect();
                (!matching.is_empty()).then(|| (name.clone(), matching))
            })
            .collect())
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<bool> {
        let mut state = self.state.lock();

        // all or nothing: check every target before touching anything
        if let Some(missing) = actions
            .iter()
            .find(|action| !state.collections.contains_key(action.collection()))
        {
            return Err(StoreError::collection_not_found(missing.collection()));
        }

        for action in actions {
            if let Some(collection) = state.collections.get_mut(action.collection()) {
                match action {
                    AliasAction::Add { alias, .. } => {
                        collection.aliases.insert(alias.clone());
                    }
                    AliasAction::Remove { alias, .. } => {
                        collection.aliases.remove(alias);
                    }
                }
            }
        }

        Ok(true)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.collections())
    }

    async fn delete_collections(&self, names: &[String]) -> Result<bool> {
        let mut state = self.state.lock();

        if let Some(missing) = names
            .iter()
            .find(|name| !state.collections.contains_key(*name))
        {
            return Err(StoreError::collection_not_found(missing.as_str()));
        }

        if self.refuse_deletes {
            return Ok(false);
        }

        for name in names {
            state.collections.remove(name);
        }
        Ok(true)
    }

    async fn set_refresh_interval(
        &self,
        collection: &str,
        interval: Option<Duration>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let target = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::collection_not_found(collection))?;
        target.refresh_interval = interval;
        Ok(())
    }

    async fn set_replica_count(&self, collection: &str, replicas: u32) -> Result<()> {
        let mut state = self.state.lock();
        let target = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::collection_not_found(collection))?;
        target.replicas = replicas;
        Ok(())
    }

    async fn create_collection(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.collections.contains_key(name) {
            return Err(StoreError::rejected(format!(
                "collection {} already exists",
                name
            )));
        }
        state.collections.insert(name.to_string(), Collection::default());
        Ok(())
    }

    async fn refresh(&self, collection: &str) -> Result<()> {
        if self.has_collection(collection) {
            Ok(())
        } else {
            Err(StoreError::collection_not_found(collection))
        }
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;
