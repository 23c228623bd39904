//! Tests for the ingest metric aggregate

use super::*;

#[test]
fn test_new_metric_is_zeroed() {
    let metric = IngestMetric::default();
    let snapshot = metric.snapshot();

    assert_eq!(snapshot.submitted, 0);
    assert_eq!(snapshot.succeeded, 0);
    assert_eq!(snapshot.failed, 0);
    assert_eq!(snapshot.current_ingest, 0);
    assert_eq!(snapshot.total_ingest.count, 0);
    assert!(snapshot.bulk_collections.is_empty());
    assert_eq!(metric.elapsed(), Duration::ZERO);
}

#[test]
fn test_counters_accumulate() {
    let metric = IngestMetric::default();

    metric.submitted().inc_by(10);
    metric.current_ingest().inc();
    metric.current_ingest_num_docs().inc_by(10);
    metric.total_ingest_size_in_bytes().inc_by(4096);

    metric.succeeded().inc_by(8);
    metric.failed().inc_by(2);
    metric.total_ingest().mark(8);
    metric.current_ingest().dec();
    metric.current_ingest_num_docs().dec_by(10);

    let snapshot = metric.snapshot();
    assert_eq!(snapshot.submitted, 10);
    assert_eq!(snapshot.completed(), 10);
    assert_eq!(snapshot.current_ingest, 0);
    assert_eq!(snapshot.current_ingest_num_docs, 0);
    assert_eq!(snapshot.total_ingest_size_in_bytes, 4096);
    assert_eq!(snapshot.total_ingest.count, 8);
}

#[test]
fn test_bulk_mode_set() {
    let metric = IngestMetric::default();
    let settings = BulkSettings {
        start_refresh: None,
        stop_refresh: Some(Duration::from_secs(1)),
    };

    assert!(metric.setup_bulk("logs-2", settings));
    assert!(metric.setup_bulk("logs-1", BulkSettings::default()));
    assert!(!metric.setup_bulk("logs-2", BulkSettings::default()));

    assert!(metric.is_bulk("logs-2"));
    assert_eq!(metric.bulk_settings("logs-2"), Some(settings));
    assert_eq!(metric.bulk_collections(), vec!["logs-1", "logs-2"]);

    assert_eq!(metric.remove_bulk("logs-2"), Some(settings));
    assert!(!metric.is_bulk("logs-2"));
    assert_eq!(metric.remove_bulk("logs-2"), None);
}

#[tokio::test]
async fn test_start_stop_window() {
    let metric = IngestMetric::new(Duration::from_secs(5));
    metric.start();
    assert!(metric.total_ingest().is_running());

    std::thread::sleep(Duration::from_millis(10));
    metric.stop();
    assert!(!metric.total_ingest().is_running());

    let elapsed = metric.elapsed();
    assert!(elapsed >= Duration::from_millis(10));

    // frozen once stopped
    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(metric.elapsed(), elapsed);
}

#[test]
fn test_snapshot_serializes() {
    let metric = IngestMetric::default();
    metric.submitted().inc_by(3);
    metric.setup_bulk("logs-9", BulkSettings::default());

    let json = serde_json::to_string(&metric.snapshot()).unwrap();
    assert!(json.contains("\"submitted\":3"));
    assert!(json.contains("logs-9"));
}
