//! Rate-limited logging of per-item failures
//!
//! A store that rejects a whole stream of documents would otherwise log
//! one line per batch. This logs at most once per interval and reports how
//! many failed batches were folded into the line.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Default interval between item failure log lines
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

pub(crate) struct ItemFailureLog {
    min_interval: Duration,
    last_log_time: Mutex<Option<Instant>>,
    suppressed: AtomicU64,
}

impl ItemFailureLog {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_log_time: Mutex::new(None),
            suppressed: AtomicU64::new(0),
        }
    }

    /// Record a batch with failed items; returns true if it was logged
    pub(crate) fn record(&self, execution_id: u64, failed: usize, message: &str) -> bool {
        let should_log = {
            let mut last_time = self.last_log_time.lock();
            let now = Instant::now();

            match *last_time {
                Some(last) if now.duration_since(last) < self.min_interval => false,
                _ => {
                    *last_time = Some(now);
                    true
                }
            }
        };

        if !should_log {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let suppressed = self.suppressed.swap(0, Ordering::Relaxed);
        tracing::error!(
            execution_id,
            failed,
            suppressed_batches = suppressed,
            failure = %message,
            "bulk request has failed items"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_failure_is_logged() {
        let log = ItemFailureLog::new(Duration::from_secs(60));
        assert!(log.record(1, 2, "already exists"));
    }

    #[test]
    fn test_repeats_are_suppressed() {
        let log = ItemFailureLog::new(Duration::from_secs(60));
        assert!(log.record(1, 1, "x"));
        assert!(!log.record(2, 1, "x"));
        assert!(!log.record(3, 1, "x"));
        assert_eq!(log.suppressed.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_zero_interval_logs_everything() {
        let log = ItemFailureLog::new(Duration::ZERO);
        assert!(log.record(1, 1, "x"));
        assert!(log.record(2, 1, "x"));
    }
}
