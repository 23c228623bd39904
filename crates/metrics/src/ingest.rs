//! Per-processor ingest metrics
//!
//! One [`IngestMetric`] belongs to one bulk processor. Counters move in
//! step with batch dispatch and completion:
//!
//! ```text
//! dispatch:   submitted += n   current_ingest += 1   current_ingest_num_docs += n
//!             total_ingest_size_in_bytes += bytes
//! success:    succeeded += ok  failed += item failures   total_ingest.mark(ok)
//! failure:    failed += n
//! completion: current_ingest -= 1   current_ingest_num_docs -= n
//! ```
//!
//! so `submitted == succeeded + failed + current_ingest_num_docs` holds
//! whenever no batch is between dispatch and completion.

use crate::{Count, MeterMetric, MeterSnapshot};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Refresh intervals recorded when a collection enters bulk mode
///
/// `None` means "refresh disabled".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkSettings {
    /// Applied while the collection is in bulk mode
    pub start_refresh: Option<Duration>,
    /// Restored when bulk mode ends
    pub stop_refresh: Option<Duration>,
}

#[derive(Debug, Default)]
struct Window {
    started: Option<Instant>,
    stopped: Option<Instant>,
}

/// Ingest metric aggregate
#[derive(Debug)]
pub struct IngestMetric {
    total_ingest: MeterMetric,
    total_ingest_size_in_bytes: Count,
    current_ingest: Count,
    current_ingest_num_docs: Count,
    submitted: Count,
    succeeded: Count,
    failed: Count,
    bulk: Mutex<HashMap<String, BulkSettings>>,
    window: Mutex<Window>,
}

impl IngestMetric {
    /// Create an aggregate whose meter ticks at `tick_interval`
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            total_ingest: MeterMetric::new(tick_interval),
            total_ingest_size_in_bytes: Count::new(),
            current_ingest: Count::new(),
            current_ingest_num_docs: Count::new(),
            submitted: Count::new(),
            succeeded: Count::new(),
            failed: Count::new(),
            bulk: Mutex::new(HashMap::new()),
            window: Mutex::new(Window::default()),
        }
    }

    /// Open the sampling window and start meter ticking
    pub fn start(&self) {
        {
            let mut window = self.window.lock();
            window.started = Some(Instant::now());
            window.stopped = None;
        }
        self.total_ingest.start();
    }

    /// Close the sampling window and cancel meter ticking
    pub fn stop(&self) {
        {
            let mut window = self.window.lock();
            if window.started.is_some() && window.stopped.is_none() {
                window.stopped = Some(Instant::now());
            }
        }
        self.total_ingest.stop();
    }

    /// Time between `start()` and `stop()`, or until now while running
    pub fn elapsed(&self) -> Duration {
        let window = self.window.lock();
        match (window.started, window.stopped) {
            (Some(started), Some(stopped)) => stopped.duration_since(started),
            (Some(started), None) => started.elapsed(),
            _ => Duration::ZERO,
        }
    }

    // =========================================================================
    // Counters
    // =========================================================================

    /// Succeeded documents, metered
    pub fn total_ingest(&self) -> &MeterMetric {
        &self.total_ingest
    }

    pub fn total_ingest_size_in_bytes(&self) -> &Count {
        &self.total_ingest_size_in_bytes
    }

    /// Batches currently in flight
    pub fn current_ingest(&self) -> &Count {
        &self.current_ingest
    }

    /// Documents currently in flight
    pub fn current_ingest_num_docs(&self) -> &Count {
        &self.current_ingest_num_docs
    }

    pub fn submitted(&self) -> &Count {
        &self.submitted
    }

    pub fn succeeded(&self) -> &Count {
        &self.succeeded
    }

    pub fn failed(&self) -> &Count {
        &self.failed
    }

    // =========================================================================
    // Bulk mode
    // =========================================================================

    /// Record a collection as being in bulk mode
    ///
    /// Returns false (and keeps the existing settings) if it already was.
    pub fn setup_bulk(&self, collection: &str, settings: BulkSettings) -> bool {
        let mut bulk = self.bulk.lock();
        if bulk.contains_key(collection) {
            return false;
        }
        bulk.insert(collection.to_string(), settings);
        true
    }

    pub fn is_bulk(&self, collection: &str) -> bool {
        self.bulk.lock().contains_key(collection)
    }

    /// Settings recorded for a collection in bulk mode
    pub fn bulk_settings(&self, collection: &str) -> Option<BulkSettings> {
        self.bulk.lock().get(collection).copied()
    }

    /// Take a collection out of bulk mode, returning its settings
    pub fn remove_bulk(&self, collection: &str) -> Option<BulkSettings> {
        self.bulk.lock().remove(collection)
    }

    /// Collections currently in bulk mode, sorted
    pub fn bulk_collections(&self) -> Vec<String> {
        let mut collections: Vec<String> = self.bulk.lock().keys().cloned().collect();
        collections.sort();
        collections
    }

    /// Get a point-in-time snapshot
    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            submitted: self.submitted.count(),
            succeeded: self.succeeded.count(),
            failed: self.failed.count(),
            current_ingest: self.current_ingest.count(),
            current_ingest_num_docs: self.current_ingest_num_docs.count(),
            total_ingest_size_in_bytes: self.total_ingest_size_in_bytes.count(),
            total_ingest: self.total_ingest.snapshot(),
            elapsed_secs: self.elapsed().as_secs_f64(),
            bulk_collections: self.bulk_collections(),
        }
    }
}

impl Default for IngestMetric {
    fn default() -> Self {
        Self::new(crate::DEFAULT_TICK_INTERVAL)
    }
}

/// Point-in-time snapshot of an [`IngestMetric`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestSnapshot {
    pub submitted: i64,
    pub succeeded: i64,
    pub failed: i64,
    pub current_ingest: i64,
    pub current_ingest_num_docs: i64,
    pub total_ingest_size_in_bytes: i64,
    pub total_ingest: MeterSnapshot,
    pub elapsed_secs: f64,
    pub bulk_collections: Vec<String>,
}

impl IngestSnapshot {
    /// Documents accounted for as succeeded or failed
    pub fn completed(&self) -> i64 {
        self.succeeded + self.failed
    }
}

#[cfg(test)]
#[path = "ingest_test.rs"]
mod ingest_test;
