//! Tests for meters and their tick task

use super::*;

#[test]
fn test_new_meter_is_empty() {
    let meter = Meter::default();
    let snapshot = meter.snapshot();

    assert_eq!(snapshot.count, 0);
    assert_eq!(snapshot.mean_rate, 0.0);
    assert_eq!(snapshot.one_minute_rate, 0.0);
    assert_eq!(meter.tick_interval(), DEFAULT_TICK_INTERVAL);
}

#[test]
fn test_mark_counts_events() {
    let meter = Meter::default();
    meter.mark(3);
    meter.mark(7);

    assert_eq!(meter.count(), 10);
    assert!(meter.mean_rate() > 0.0);
}

#[test]
fn test_tick_converts_to_per_second() {
    let meter = Meter::new(Duration::from_secs(5));
    meter.mark(50);
    meter.tick();

    assert!((meter.one_minute_rate() - 10.0).abs() < 1e-9);
    assert!((meter.five_minute_rate() - 10.0).abs() < 1e-9);
    assert!((meter.fifteen_minute_rate() - 10.0).abs() < 1e-9);
}

#[test]
fn test_windows_decay_at_different_speeds() {
    let meter = Meter::new(Duration::from_secs(5));
    meter.mark(50);
    meter.tick();
    for _ in 0..5 {
        meter.tick();
    }

    assert!(meter.one_minute_rate() < meter.five_minute_rate());
    assert!(meter.five_minute_rate() < meter.fifteen_minute_rate());
}

#[test]
fn test_start_restarts_mean_rate_clock() {
    let metric = MeterMetric::default();
    std::thread::sleep(Duration::from_millis(200));

    metric.start();
    metric.mark(10);

    // measured from start, not from construction (which would give ~50/s)
    assert!(metric.snapshot().mean_rate > 100.0);
}

#[test]
fn test_start_outside_runtime_does_not_tick() {
    let metric = MeterMetric::default();
    metric.start();
    assert!(!metric.is_running());

    metric.mark(5);
    assert_eq!(metric.snapshot().count, 5);
}

#[tokio::test(start_paused = true)]
async fn test_tick_task_drives_rates() {
    let metric = MeterMetric::new(Duration::from_secs(5));
    metric.start();
    assert!(metric.is_running());

    metric.mark(500);
    tokio::time::sleep(Duration::from_millis(5_100)).await;

    assert!((metric.snapshot().one_minute_rate - 100.0).abs() < 1e-9);
    metric.stop();
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_ticking() {
    let metric = MeterMetric::new(Duration::from_secs(5));
    metric.start();
    metric.mark(500);
    tokio::time::sleep(Duration::from_millis(5_100)).await;

    metric.stop();
    assert!(!metric.is_running());
    tokio::task::yield_now().await;

    let before = metric.snapshot().one_minute_rate;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(metric.snapshot().one_minute_rate, before);
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
    let metric = MeterMetric::new(Duration::from_secs(5));
    metric.start();
    metric.start();

    metric.mark(500);
    tokio::time::sleep(Duration::from_millis(5_100)).await;

    // a second task would have ticked again and zeroed the instant rate
    assert!((metric.snapshot().one_minute_rate - 100.0).abs() < 1e-9);
}
