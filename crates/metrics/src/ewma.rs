//! Exponentially weighted moving average
//!
//! Classic Unix load-average decay: for a tick interval `I` (seconds) and a
//! window of `W` minutes, `alpha = 1 - exp(-I / (60 * W))`. Each tick folds
//! the events counted since the previous tick into the running rate.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// EWMA rate tracker
///
/// `update()` is lock-free; `tick()` takes a short lock and is expected to
/// be called from a single scheduled task.
#[derive(Debug)]
pub struct Ewma {
    alpha: f64,
    interval_secs: f64,
    uncounted: AtomicU64,
    state: Mutex<EwmaState>,
}

#[derive(Debug, Default)]
struct EwmaState {
    /// Events per second
    rate: f64,
    initialized: bool,
}

impl Ewma {
    /// Create an EWMA with an explicit smoothing factor
    pub fn new(alpha: f64, interval: Duration) -> Self {
        Self {
            alpha,
            interval_secs: interval.as_secs_f64(),
            uncounted: AtomicU64::new(0),
            state: Mutex::new(EwmaState::default()),
        }
    }

    /// Create an EWMA averaging over `minutes` for the given tick interval
    pub fn with_window(minutes: f64, interval: Duration) -> Self {
        Self::new(Self::alpha_for(interval, minutes), interval)
    }

    /// 1-minute moving average
    pub fn one_minute(interval: Duration) -> Self {
        Self::with_window(1.0, interval)
    }

    /// 5-minute moving average
    pub fn five_minute(interval: Duration) -> Self {
        Self::with_window(5.0, interval)
    }

    /// 15-minute moving average
    pub fn fifteen_minute(interval: Duration) -> Self {
        Self::with_window(15.0, interval)
    }

    /// Smoothing factor for a tick interval and a window in minutes
    pub fn alpha_for(interval: Duration, minutes: f64) -> f64 {
        1.0 - (-interval.as_secs_f64() / (60.0 * minutes)).exp()
    }

    /// Smoothing factor in use
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Record `n` events
    #[inline]
    pub fn update(&self, n: u64) {
        self.uncounted.fetch_add(n, Ordering::Relaxed);
    }

    /// Fold the events counted since the last tick into the rate
    ///
    /// The first tick adopts the instant rate as-is.
    pub fn tick(&self) {
        let count = self.uncounted.swap(0, Ordering::Relaxed);
        let instant_rate = if self.interval_secs > 0.0 {
            count as f64 / self.interval_secs
        } else {
            0.0
        };

        let mut state = self.state.lock();
        if state.initialized {
            state.rate += self.alpha * (instant_rate - state.rate);
        } else {
            state.rate = instant_rate;
            state.initialized = true;
        }
    }

    /// Current rate in events per second (0 before the first tick)
    pub fn rate(&self) -> f64 {
        self.state.lock().rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_secs(5);

    #[test]
    fn test_alpha_matches_load_average_constants() {
        let m1 = Ewma::one_minute(TICK);
        let m5 = Ewma::five_minute(TICK);
        let m15 = Ewma::fifteen_minute(TICK);

        assert!((m1.alpha() - (1.0 - (-5.0f64 / 60.0).exp())).abs() < 1e-12);
        assert!((m5.alpha() - (1.0 - (-5.0f64 / 300.0).exp())).abs() < 1e-12);
        assert!((m15.alpha() - (1.0 - (-5.0f64 / 900.0).exp())).abs() < 1e-12);
        assert!(m1.alpha() > m5.alpha());
        assert!(m5.alpha() > m15.alpha());
    }

    #[test]
    fn test_rate_zero_before_first_tick() {
        let ewma = Ewma::one_minute(TICK);
        ewma.update(1000);
        assert_eq!(ewma.rate(), 0.0);
    }

    #[test]
    fn test_first_tick_is_unsmoothed() {
        let ewma = Ewma::one_minute(TICK);
        ewma.update(500);
        ewma.tick();
        assert!((ewma.rate() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_tick_applies_decay_formula() {
        let ewma = Ewma::one_minute(TICK);
        ewma.update(500);
        ewma.tick();

        ewma.tick();
        let expected = 100.0 + ewma.alpha() * (0.0 - 100.0);
        assert!((ewma.rate() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_constant_rate_converges() {
        let ewma = Ewma::one_minute(TICK);
        for _ in 0..20 {
            ewma.update(500);
            ewma.tick();
        }
        let rate = ewma.rate();
        assert!((rate - 100.0).abs() / 100.0 < 0.01, "rate = {}", rate);
    }

    #[test]
    fn test_converges_after_idle_start() {
        let ewma = Ewma::one_minute(TICK);
        // an idle first interval pins the rate at zero
        ewma.tick();

        for _ in 0..60 {
            ewma.update(500);
            ewma.tick();
        }
        let rate = ewma.rate();
        assert!((rate - 100.0).abs() / 100.0 < 0.01, "rate = {}", rate);
    }

    #[test]
    fn test_decays_towards_zero_without_events() {
        let ewma = Ewma::one_minute(TICK);
        ewma.update(500);
        ewma.tick();

        let mut previous = ewma.rate();
        for _ in 0..10 {
            ewma.tick();
            let rate = ewma.rate();
            assert!(rate < previous);
            previous = rate;
        }
    }
}
