//! Sluice - Metrics
//!
//! Throughput and backpressure observability for the bulk processor.
//!
//! # Overview
//!
//! This crate provides:
//! - [`Count`]: a lock-free signed counter usable as a counter or a gauge
//! - [`Ewma`] and [`Meter`]: 1/5/15-minute exponentially weighted rates
//! - [`MeterMetric`]: a meter that owns its periodic tick task
//! - [`IngestMetric`]: the per-processor aggregate (submitted, succeeded,
//!   failed, in-flight, bytes, bulk-mode collections)
//! - [`MetricsReporter`]: logs an [`IngestSnapshot`] at a fixed interval
//!
//! # Design Principles
//!
//! - **Lock-free hot path**: counters and meter marks are atomic adds
//! - **Owned ticking**: each meter's decay task is started and cancelled
//!   with the metric that owns it, nothing is global
//! - **Snapshots**: readers take a serializable point-in-time copy
//!
//! # Example
//!
//! ```ignore
//! let metric = Arc::new(IngestMetric::default());
//! metric.start();
//! metric.submitted().inc_by(100);
//! metric.total_ingest().mark(100);
//! let snapshot = metric.snapshot();
//! metric.stop();
//! ```

mod ewma;
pub mod format;
mod ingest;
mod meter;
mod reporter;

pub use ewma::Ewma;
pub use format::{HumanFormatter, JsonFormatter, MetricsFormatter};
pub use ingest::{BulkSettings, IngestMetric, IngestSnapshot};
pub use meter::{DEFAULT_TICK_INTERVAL, Meter, MeterMetric, MeterSnapshot};
pub use reporter::MetricsReporter;

use std::sync::atomic::{AtomicI64, Ordering};

/// Atomic counter for metric operations
///
/// Signed so that gauges (incremented on submit, decremented on
/// completion) share the same type as monotonic counters.
#[derive(Debug, Default)]
pub struct Count(AtomicI64);

impl Count {
    /// Create a new count initialized to 0
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicI64::new(0))
    }

    /// Increment by 1
    #[inline]
    pub fn inc(&self) {
        self.inc_by(1);
    }

    /// Increment by `n` (relaxed ordering for performance)
    #[inline]
    pub fn inc_by(&self, n: i64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// Decrement by 1
    #[inline]
    pub fn dec(&self) {
        self.dec_by(1);
    }

    /// Decrement by `n`
    #[inline]
    pub fn dec_by(&self, n: i64) {
        self.0.fetch_sub(n, Ordering::Relaxed);
    }

    /// Get the current value
    #[inline]
    pub fn count(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_count_inc_dec() {
        let count = Count::new();
        count.inc();
        count.inc_by(10);
        count.dec();
        count.dec_by(3);
        assert_eq!(count.count(), 7);
    }

    #[test]
    fn test_count_concurrent_writers() {
        let count = Arc::new(Count::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let count = Arc::clone(&count);
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        count.inc();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(count.count(), 80_000);
    }
}
