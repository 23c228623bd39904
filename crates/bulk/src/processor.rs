//! Bulk processor
//!
//! # Design
//!
//! ```text
//! add() ──► [accumulation buffer] ──threshold/flush/timer──► dispatch
//!                  (one lock)                                   │
//!                                            acquire permit (blocks when
//!                                            max_concurrent_requests are
//!                                            in flight) ──► spawn sink call
//!                                                              │
//!                               metric + BulkEvent::After ◄────┘
//! ```
//!
//! The buffer lock is held while a full batch waits for its permit, so
//! batches are dispatched in submission order and a producer stalls for as
//! long as the store is saturated. The sink call itself runs on its own
//! task; completion order across batches is not guaranteed.
//!
//! A failed batch is never retried. It flips the processor to disabled
//! (unless `ignore_errors` is set) and is kept as the processor's cause.

use crate::error::{BulkError, Result};
use crate::event::{BulkEvent, BulkOutcome};
use crate::failure_log::{DEFAULT_LOG_INTERVAL, ItemFailureLog};
use parking_lot::Mutex;
use sluice_config::{BulkConfig, ConfigError};
use sluice_metrics::{BulkSettings, IngestMetric};
use sluice_store::{
    Batch, BulkResponse, BulkSink, IndexAdmin, InvalidOperation, Operation, StoreError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, broadcast, watch};
use tokio::time::{MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Default capacity of the event broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Builder for [`BulkProcessor`]
pub struct BulkProcessorBuilder {
    sink: Arc<dyn BulkSink>,
    config: BulkConfig,
    admin: Option<Arc<dyn IndexAdmin>>,
    metric: Option<Arc<IngestMetric>>,
    event_capacity: usize,
    failure_log_interval: Duration,
}

impl BulkProcessorBuilder {
    /// Batching and concurrency bounds
    pub fn config(mut self, config: BulkConfig) -> Self {
        self.config = config;
        self
    }

    /// Admin client used by bulk mode
    pub fn admin(mut self, admin: Arc<dyn IndexAdmin>) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Use an existing metric aggregate instead of a fresh one
    pub fn metric(mut self, metric: Arc<IngestMetric>) -> Self {
        self.metric = Some(metric);
        self
    }

    /// Capacity of the event channel returned by `subscribe()`
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Minimum interval between item failure log lines
    pub fn failure_log_interval(mut self, interval: Duration) -> Self {
        self.failure_log_interval = interval;
        self
    }

    /// Validate the bounds, start the metric and the flush timer
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Result<BulkProcessor> {
        validate(&self.config)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BulkError::NoRuntime)?;

        let metric = self.metric.unwrap_or_default();
        let (events, _) = broadcast::channel(self.event_capacity);
        let (pending, _) = watch::channel(0usize);

        let shared = Arc::new(Shared {
            permits: Arc::new(Semaphore::new(self.config.max_concurrent_requests)),
            buffer: tokio::sync::Mutex::new(Batch::with_capacity(self.config.max_actions)),
            config: self.config,
            sink: self.sink,
            admin: self.admin,
            metric,
            execution_ids: AtomicU64::new(0),
            pending,
            enabled: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            cause: Mutex::new(None),
            events,
            item_failures: ItemFailureLog::new(self.failure_log_interval),
        });

        shared.metric.start();

        let timer = CancellationToken::new();
        if shared.config.flush_timer_enabled() {
            runtime.spawn(run_flush_timer(
                Arc::clone(&shared),
                shared.config.flush_interval,
                timer.clone(),
            ));
        }

        info!(
            max_actions = shared.config.max_actions,
            max_volume = shared.config.max_volume,
            max_concurrent_requests = shared.config.max_concurrent_requests,
            flush_interval = ?shared.config.flush_interval,
            "bulk processor started"
        );

        Ok(BulkProcessor { shared, timer })
    }
}

fn invalid(field: &'static str, message: &str) -> Result<()> {
    Err(ConfigError::invalid_value("bulk", field, message).into())
}

fn validate(config: &BulkConfig) -> Result<()> {
    if config.max_actions == 0 {
        return invalid("max_actions", "must be at least 1");
    }
    if config.max_volume == 0 {
        return invalid("max_volume", "must be at least 1 byte");
    }
    if config.max_concurrent_requests == 0 {
        return invalid("max_concurrent_requests", "must be at least 1");
    }
    if config.max_concurrent_requests > Semaphore::MAX_PERMITS {
        return invalid("max_concurrent_requests", "exceeds the semaphore permit limit");
    }
    Ok(())
}

/// Admission-control engine in front of a [`BulkSink`]
///
/// Share it between producers behind an `Arc`; every method takes `&self`.
pub struct BulkProcessor {
    shared: Arc<Shared>,
    timer: CancellationToken,
}

struct Shared {
    config: BulkConfig,
    sink: Arc<dyn BulkSink>,
    admin: Option<Arc<dyn IndexAdmin>>,
    metric: Arc<IngestMetric>,

    buffer: tokio::sync::Mutex<Batch>,
    permits: Arc<Semaphore>,
    execution_ids: AtomicU64,
    /// Batches handed off but not yet answered
    pending: watch::Sender<usize>,

    enabled: AtomicBool,
    closed: AtomicBool,
    cause: Mutex<Option<StoreError>>,

    events: broadcast::Sender<BulkEvent>,
    item_failures: ItemFailureLog,
}

impl BulkProcessor {
    /// Start building a processor that writes to `sink`
    pub fn builder(sink: Arc<dyn BulkSink>) -> BulkProcessorBuilder {
        BulkProcessorBuilder {
            sink,
            config: BulkConfig::default(),
            admin: None,
            metric: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            failure_log_interval: DEFAULT_LOG_INTERVAL,
        }
    }

    // =========================================================================
    // Producer API
    // =========================================================================

    /// Append an operation to the current batch
    ///
    /// Dispatches the batch when it reaches `max_actions` or `max_volume`,
    /// waiting for a permit if `max_concurrent_requests` batches are in
    /// flight. A disabled processor accepts and drops the operation.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed operation (the processor stays
    /// enabled), `Closed` after `close()`.
    pub async fn add(&self, operation: Operation) -> Result<()> {
        let shared = &self.shared;

        operation.validate()?;
        if operation.estimated_size() > shared.config.max_volume {
            return Err(InvalidOperation::TooLarge {
                size: operation.estimated_size(),
                max: shared.config.max_volume,
            }
            .into());
        }

        shared.ensure_open()?;
        if !shared.is_enabled() {
            trace!(collection = operation.collection(), "processor disabled, dropping operation");
            return Ok(());
        }

        let mut buffer = shared.buffer.lock().await;

        // close() and the failure latch may have flipped while we waited
        shared.ensure_open()?;
        if !shared.is_enabled() {
            return Ok(());
        }

        if !buffer.is_empty()
            && buffer.estimated_bytes() + operation.estimated_size() > shared.config.max_volume
        {
            let batch = buffer.take();
            shared.dispatch(batch).await;
        }

        buffer.push(operation);

        if buffer.len() >= shared.config.max_actions
            || buffer.estimated_bytes() >= shared.config.max_volume
        {
            let batch = buffer.take();
            shared.dispatch(batch).await;
        }

        Ok(())
    }

    /// Hand off the current batch regardless of thresholds
    pub async fn flush(&self) -> Result<()> {
        self.shared.ensure_open()?;
        self.shared.flush_buffer().await;
        Ok(())
    }

    /// Wait until every handed-off batch has been answered
    ///
    /// Returns false if `timeout` elapsed first; outstanding batches keep
    /// running in the background.
    pub async fn wait_for_completion(&self, timeout: Duration) -> bool {
        let mut pending = self.shared.pending.subscribe();

        match tokio::time::timeout(timeout, pending.wait_for(|n| *n == 0)).await {
            Ok(_) => true,
            Err(_) => {
                warn!(
                    pending = *self.shared.pending.borrow(),
                    timeout = ?timeout,
                    "timed out waiting for bulk responses"
                );
                false
            }
        }
    }

    /// Flush, wait for outstanding batches, then stop the timer and metric
    ///
    /// Returns whether all batches drained within `close_timeout`. Calling
    /// it again only repeats the wait.
    pub async fn close(&self) -> bool {
        let already_closed = {
            let mut buffer = self.shared.buffer.lock().await;
            let already_closed = self.shared.closed.swap(true, Ordering::SeqCst);
            if !already_closed && !buffer.is_empty() {
                let batch = buffer.take();
                self.shared.dispatch(batch).await;
            }
            already_closed
        };

        let drained = self
            .wait_for_completion(self.shared.config.close_timeout)
            .await;

        if !already_closed {
            self.timer.cancel();
            self.shared.metric.stop();
            info!(
                drained,
                batches = self.shared.execution_ids.load(Ordering::Relaxed),
                "bulk processor closed"
            );
        }

        drained
    }

    // =========================================================================
    // Bulk mode
    // =========================================================================

    /// Put a collection into bulk mode
    ///
    /// Records both refresh intervals and applies `start_refresh` (`None`
    /// disables refresh). Returns false if the collection was already in
    /// bulk mode.
    pub async fn start_bulk(
        &self,
        collection: &str,
        start_refresh: Option<Duration>,
        stop_refresh: Option<Duration>,
    ) -> Result<bool> {
        let admin = self.admin()?;
        let settings = BulkSettings {
            start_refresh,
            stop_refresh,
        };

        if !self.shared.metric.setup_bulk(collection, settings) {
            return Ok(false);
        }

        if let Err(e) = admin.set_refresh_interval(collection, start_refresh).await {
            self.shared.metric.remove_bulk(collection);
            return Err(e.into());
        }

        info!(collection, refresh = ?start_refresh, "bulk mode started");
        Ok(true)
    }

    /// Take a collection out of bulk mode
    ///
    /// Flushes and waits for all outstanding batches first, so refresh is
    /// never restored under in-flight writes. Returns false if the
    /// collection was not in bulk mode.
    ///
    /// # Errors
    ///
    /// `Timeout` if batches do not drain within `close_timeout`; the
    /// collection then stays in bulk mode.
    pub async fn stop_bulk(&self, collection: &str) -> Result<bool> {
        let admin = self.admin()?;
        let Some(settings) = self.shared.metric.bulk_settings(collection) else {
            return Ok(false);
        };

        if !self.is_closed() {
            self.shared.flush_buffer().await;
        }
        let timeout = self.shared.config.close_timeout;
        if !self.wait_for_completion(timeout).await {
            return Err(BulkError::Timeout(timeout));
        }

        admin
            .set_refresh_interval(collection, settings.stop_refresh)
            .await?;
        self.shared.metric.remove_bulk(collection);

        info!(collection, refresh = ?settings.stop_refresh, "bulk mode stopped");
        Ok(true)
    }

    fn admin(&self) -> Result<&Arc<dyn IndexAdmin>> {
        self.shared.admin.as_ref().ok_or(BulkError::AdminUnavailable)
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Metric aggregate owned by this processor
    pub fn metric(&self) -> &Arc<IngestMetric> {
        &self.shared.metric
    }

    pub fn config(&self) -> &BulkConfig {
        &self.shared.config
    }

    /// Subscribe to batch lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<BulkEvent> {
        self.shared.events.subscribe()
    }

    /// Batches currently holding a dispatch permit
    pub fn outstanding(&self) -> usize {
        self.shared.config.max_concurrent_requests - self.shared.permits.available_permits()
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.is_enabled()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Whether a batch has failed
    pub fn has_throwable(&self) -> bool {
        self.shared.cause.lock().is_some()
    }

    /// Cause of the most recent failed batch
    pub fn throwable(&self) -> Option<StoreError> {
        self.shared.cause.lock().clone()
    }
}

impl Drop for BulkProcessor {
    fn drop(&mut self) {
        self.timer.cancel();
        if !self.is_closed() {
            self.shared.metric.stop();
        }
    }
}

impl Shared {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BulkError::Closed)
        } else {
            Ok(())
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn flush_buffer(self: &Arc<Self>) {
        let mut buffer = self.buffer.lock().await;
        if !buffer.is_empty() {
            let batch = buffer.take();
            self.dispatch(batch).await;
        }
    }

    /// Hand a batch to the sink under the concurrency bound
    ///
    /// Called with the buffer lock held.
    async fn dispatch(self: &Arc<Self>, batch: Batch) {
        let execution_id = self.execution_ids.fetch_add(1, Ordering::Relaxed) + 1;
        let actions = batch.len();

        self.pending.send_modify(|n| *n += 1);
        let pending = PendingGuard(Arc::clone(self));

        self.before_bulk(execution_id, actions, batch.estimated_bytes());

        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                self.after_bulk(
                    execution_id,
                    actions,
                    Err(StoreError::rejected("dispatch permits closed")),
                );
                return;
            }
        };

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            // dropped in reverse order: permit first, then pending
            let _pending = pending;
            let _permit = permit;
            // a panicking sink counts as a failed batch
            let sink = Arc::clone(&shared.sink);
            let result = match tokio::spawn(async move { sink.submit_batch(batch).await }).await {
                Ok(result) => result,
                Err(e) => Err(StoreError::rejected(format!("bulk request task failed: {e}"))),
            };
            shared.after_bulk(execution_id, actions, result);
        });
    }

    fn before_bulk(&self, execution_id: u64, actions: usize, bytes: u64) {
        let metric = &self.metric;
        metric.submitted().inc_by(actions as i64);
        metric.current_ingest().inc();
        metric.current_ingest_num_docs().inc_by(actions as i64);
        metric.total_ingest_size_in_bytes().inc_by(bytes as i64);

        debug!(
            execution_id,
            actions,
            bytes,
            in_flight = metric.current_ingest().count(),
            "before bulk"
        );

        // no subscribers is fine
        let _ = self.events.send(BulkEvent::Before {
            execution_id,
            actions,
            bytes,
        });
    }

    fn after_bulk(
        &self,
        execution_id: u64,
        actions: usize,
        result: std::result::Result<BulkResponse, StoreError>,
    ) {
        let metric = &self.metric;

        let outcome = match result {
            Ok(response) => {
                let succeeded = response.succeeded_count().min(actions);
                let failed = actions - succeeded;

                metric.succeeded().inc_by(succeeded as i64);
                metric.failed().inc_by(failed as i64);
                metric.total_ingest().mark(succeeded as u64);

                if failed > 0 {
                    let message = response.failure_message().unwrap_or_default();
                    self.item_failures.record(execution_id, failed, &message);
                } else {
                    debug!(
                        execution_id,
                        actions,
                        took_ms = response.took.as_millis() as u64,
                        "after bulk"
                    );
                }

                BulkOutcome::Success(Arc::new(response))
            }
            Err(e) => {
                metric.failed().inc_by(actions as i64);
                error!(execution_id, actions, error = %e, "bulk request failed");

                *self.cause.lock() = Some(e.clone());
                if !self.config.ignore_errors && self.enabled.swap(false, Ordering::SeqCst) {
                    warn!(execution_id, "bulk processor disabled after failed batch");
                }

                BulkOutcome::Failure(e)
            }
        };

        metric.current_ingest().dec();
        metric.current_ingest_num_docs().dec_by(actions as i64);

        let _ = self.events.send(BulkEvent::After {
            execution_id,
            actions,
            outcome,
        });
    }
}

/// Marks a handed-off batch as answered when dropped
struct PendingGuard(Arc<Shared>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.pending.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Flush whatever has accumulated every `period`, so slow producers do not
/// leave operations sitting in the buffer
async fn run_flush_timer(shared: Arc<Shared>, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if shared.closed.load(Ordering::SeqCst) {
                    break;
                }
                shared.flush_buffer().await;
            }
        }
    }

    debug!("flush timer stopped");
}

#[cfg(test)]
#[path = "processor_test.rs"]
mod processor_test;
