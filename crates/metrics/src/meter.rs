//! Rate meters
//!
//! A [`Meter`] counts events and keeps 1/5/15-minute EWMA rates plus a
//! mean rate since the meter was started. It never ticks on its own; [`MeterMetric`]
//! owns the scheduled task that drives `tick()`.

use crate::Ewma;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::time::{MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

/// Default interval between EWMA decay ticks
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Event meter with moving-average rates
#[derive(Debug)]
pub struct Meter {
    count: AtomicU64,
    started: Mutex<Instant>,
    tick_interval: Duration,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl Meter {
    /// Create a meter for the given tick interval
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            count: AtomicU64::new(0),
            started: Mutex::new(Instant::now()),
            tick_interval,
            m1: Ewma::one_minute(tick_interval),
            m5: Ewma::five_minute(tick_interval),
            m15: Ewma::fifteen_minute(tick_interval),
        }
    }

    /// Record `n` events now
    #[inline]
    pub fn mark(&self, n: u64) {
        self.count.fetch_add(n, Ordering::Relaxed);
        self.m1.update(n);
        self.m5.update(n);
        self.m15.update(n);
    }

    /// Decay all moving averages by one interval
    pub fn tick(&self) {
        self.m1.tick();
        self.m5.tick();
        self.m15.tick();
    }

    /// Measure the mean rate from now on
    pub fn reset_start(&self) {
        *self.started.lock() = Instant::now();
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Total events recorded
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Events per second since creation or the last `reset_start`, 0 before any event
    pub fn mean_rate(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        let elapsed = self.started.lock().elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        count as f64 / elapsed
    }

    pub fn one_minute_rate(&self) -> f64 {
        self.m1.rate()
    }

    pub fn five_minute_rate(&self) -> f64 {
        self.m5.rate()
    }

    pub fn fifteen_minute_rate(&self) -> f64 {
        self.m15.rate()
    }

    /// Get a point-in-time snapshot
    pub fn snapshot(&self) -> MeterSnapshot {
        MeterSnapshot {
            count: self.count(),
            mean_rate: self.mean_rate(),
            one_minute_rate: self.one_minute_rate(),
            five_minute_rate: self.five_minute_rate(),
            fifteen_minute_rate: self.fifteen_minute_rate(),
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

/// Point-in-time snapshot of a meter (rates are per second)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MeterSnapshot {
    pub count: u64,
    pub mean_rate: f64,
    pub one_minute_rate: f64,
    pub five_minute_rate: f64,
    pub fifteen_minute_rate: f64,
}

/// A meter together with the task that ticks it
///
/// `start()` spawns the tick task on the current tokio runtime and
/// `stop()` cancels it. Dropping the metric stops ticking as well.
#[derive(Debug)]
pub struct MeterMetric {
    meter: Arc<Meter>,
    ticker: Mutex<Option<CancellationToken>>,
}

impl MeterMetric {
    /// Create a stopped meter metric
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            meter: Arc::new(Meter::new(tick_interval)),
            ticker: Mutex::new(None),
        }
    }

    /// Start ticking and restart the mean-rate clock (no-op if already running)
    ///
    /// Outside a tokio runtime the meter still counts but its moving
    /// averages stay at zero.
    pub fn start(&self) {
        let mut ticker = self.ticker.lock();
        if ticker.is_some() {
            return;
        }
        self.meter.reset_start();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no tokio runtime, meter moving averages will not tick");
            return;
        };

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let meter = Arc::clone(&self.meter);
        let period = meter.tick_interval();

        runtime.spawn(async move {
            let mut interval = interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => meter.tick(),
                }
            }
        });

        *ticker = Some(cancel);
    }

    /// Stop ticking (no-op if not running)
    pub fn stop(&self) {
        if let Some(cancel) = self.ticker.lock().take() {
            cancel.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.lock().is_some()
    }

    /// Record `n` events
    #[inline]
    pub fn mark(&self, n: u64) {
        self.meter.mark(n);
    }

    /// Shared handle to the underlying meter
    pub fn meter(&self) -> &Arc<Meter> {
        &self.meter
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        self.meter.snapshot()
    }
}

impl Default for MeterMetric {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl Drop for MeterMetric {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "meter_test.rs"]
mod meter_test;
