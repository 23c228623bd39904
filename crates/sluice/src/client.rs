//! IngestClient - one handle for writes, bulk mode and alias rotation

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use sluice_bulk::BulkProcessor;
use sluice_config::Config;
use sluice_metrics::{IngestMetric, MetricsReporter};
use sluice_retention::{AliasUpdate, RetentionOutcome, RetentionPolicy};
use sluice_store::{BulkSink, IndexAdmin, OpKind, Operation, StoreError};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Client facade over a bulk processor, its metric and a retention policy
///
/// Built inside a tokio runtime. Writes go through the processor; admin
/// calls go straight to the store.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(MemoryStore::new());
/// let client = IngestClient::new(Config::default(), store.clone(), store)?;
///
/// client.new_collection("logs-10").await?;
/// client.start_bulk("logs-10", None, Some(Duration::from_secs(1))).await?;
/// client.index("logs-10", "1", r#"{"msg":"hello"}"#).await?;
/// client.stop_bulk("logs-10").await?;
/// client.update_aliases("logs", "logs-10").await?;
/// client.shutdown().await;
/// ```
pub struct IngestClient {
    config: Config,
    admin: Arc<dyn IndexAdmin>,
    processor: BulkProcessor,
    retention: RetentionPolicy,
    reporter: CancellationToken,
}

impl IngestClient {
    /// Validate `config`, start the processor and, if enabled, the reporter
    pub fn new(config: Config, sink: Arc<dyn BulkSink>, admin: Arc<dyn IndexAdmin>) -> Result<Self> {
        config.validate()?;

        let metric = Arc::new(IngestMetric::new(config.metrics.tick_interval));
        let processor = BulkProcessor::builder(sink)
            .admin(Arc::clone(&admin))
            .config(config.bulk.clone())
            .metric(Arc::clone(&metric))
            .build()?;

        let reporter = CancellationToken::new();
        if config.metrics.enabled {
            let task = MetricsReporter::new("ingest", metric, &config.metrics);
            tokio::spawn(task.run(reporter.clone()));
        }

        let retention = RetentionPolicy::new(Arc::clone(&admin), config.retention.clone());

        Ok(Self {
            config,
            admin,
            processor,
            retention,
            reporter,
        })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Index a document, replacing any document with the same id
    ///
    /// An empty `id` lets the store assign one.
    pub async fn index(
        &self,
        collection: &str,
        id: &str,
        payload: impl Into<Bytes>,
    ) -> Result<()> {
        self.write(OpKind::Index, collection, id, payload.into())
            .await
    }

    /// Create a document, failing in the store if the id exists
    pub async fn create(
        &self,
        collection: &str,
        id: &str,
        payload: impl Into<Bytes>,
    ) -> Result<()> {
        self.write(OpKind::Create, collection, id, payload.into())
            .await
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.write(OpKind::Delete, collection, id, Bytes::new()).await
    }

    /// Submit a prepared operation
    pub async fn add(&self, operation: Operation) -> Result<()> {
        Ok(self.processor.add(operation).await?)
    }

    async fn write(&self, kind: OpKind, collection: &str, id: &str, payload: Bytes) -> Result<()> {
        let operation = Operation::new(kind, collection, Some(id.to_string()), payload);
        self.add(operation).await
    }

    /// Hand the current batch to the store
    pub async fn flush_ingest(&self) -> Result<()> {
        Ok(self.processor.flush().await?)
    }

    /// Wait for outstanding batches, false on timeout
    pub async fn wait_for_responses(&self, timeout: Duration) -> bool {
        self.processor.wait_for_completion(timeout).await
    }

    // =========================================================================
    // Collections
    // =========================================================================

    pub async fn new_collection(&self, name: &str) -> Result<()> {
        self.admin.create_collection(name).await?;
        tracing::info!(collection = name, "collection created");
        Ok(())
    }

    /// Delete a collection, returning whether the store acknowledged
    pub async fn delete_collection(&self, name: &str) -> Result<bool> {
        let acknowledged = self.admin.delete_collections(&[name.to_string()]).await?;
        if !acknowledged {
            tracing::warn!(collection = name, "delete was not acknowledged");
        }
        Ok(acknowledged)
    }

    pub async fn refresh(&self, name: &str) -> Result<()> {
        Ok(self.admin.refresh(name).await?)
    }

    pub async fn update_replica_level(&self, name: &str, replicas: u32) -> Result<()> {
        self.admin.set_replica_count(name, replicas).await?;
        tracing::info!(collection = name, replicas, "replica level updated");
        Ok(())
    }

    /// Put a collection into bulk mode (`None` disables refresh)
    pub async fn start_bulk(
        &self,
        collection: &str,
        start_refresh: Option<Duration>,
        stop_refresh: Option<Duration>,
    ) -> Result<bool> {
        Ok(self
            .processor
            .start_bulk(collection, start_refresh, stop_refresh)
            .await?)
    }

    /// Drain outstanding writes and restore the collection's refresh interval
    pub async fn stop_bulk(&self, collection: &str) -> Result<bool> {
        Ok(self.processor.stop_bulk(collection).await?)
    }

    // =========================================================================
    // Aliases and retention
    // =========================================================================

    /// Move `alias` to `concrete`, then prune if retention is enabled
    pub async fn update_aliases(&self, alias: &str, concrete: &str) -> Result<AliasUpdate> {
        Ok(self.retention.update_aliases(alias, concrete).await?)
    }

    pub async fn perform_retention_policy(
        &self,
        alias: &str,
        concrete: &str,
        max_age: i64,
        min_to_keep: i64,
    ) -> RetentionOutcome {
        self.retention
            .perform_retention_policy(alias, concrete, max_age, min_to_keep)
            .await
    }

    /// Prune with the configured `diff` and `mintokeep`
    ///
    /// `None` when retention is disabled.
    pub async fn apply_retention(&self, alias: &str, concrete: &str) -> Option<RetentionOutcome> {
        let retention = &self.config.retention;
        if !retention.enabled {
            return None;
        }
        Some(
            self.perform_retention_policy(alias, concrete, retention.diff, retention.min_to_keep)
                .await,
        )
    }

    pub async fn resolve_alias(&self, alias: &str) -> String {
        self.retention.resolve_alias(alias).await
    }

    pub async fn resolve_most_recent(&self, alias: &str) -> String {
        self.retention.resolve_most_recent(alias).await
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn processor(&self) -> &BulkProcessor {
        &self.processor
    }

    pub fn metric(&self) -> &Arc<IngestMetric> {
        self.processor.metric()
    }

    pub fn has_throwable(&self) -> bool {
        self.processor.has_throwable()
    }

    pub fn throwable(&self) -> Option<StoreError> {
        self.processor.throwable()
    }

    /// Close the processor and take every collection out of bulk mode
    ///
    /// Returns whether all batches drained. Bulk mode is left on for
    /// collections whose refresh interval cannot be restored; those are
    /// logged.
    pub async fn shutdown(&self) -> bool {
        let drained = self.processor.close().await;

        for collection in self.metric().bulk_collections() {
            if let Err(e) = self.processor.stop_bulk(&collection).await {
                tracing::warn!(collection = %collection, error = %e, "cannot leave bulk mode");
            }
        }

        self.reporter.cancel();
        self.metric().stop();
        tracing::info!(drained, "ingest client shut down");
        drained
    }
}

impl Drop for IngestClient {
    fn drop(&mut self) {
        self.reporter.cancel();
    }
}

impl std::fmt::Debug for IngestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestClient")
            .field("config", &self.config)
            .field("closed", &self.processor.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;
