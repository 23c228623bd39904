//! Human-readable metrics formatter
//!
//! # Example Output
//!
//! ```text
//! [metrics] ingest: submitted 12.0K | ok 11.9K | failed 3 | in-flight 2 (1.0K docs) | 45.3 MB
//! [metrics] ingest rate: 1m 1.2K/s | 5m 980/s | 15m 410/s | mean 1.1K/s | bulk: logs-10
//! ```

use super::{MetricsFormatter, format_bytes, format_count, format_rate, non_negative};
use crate::{IngestSnapshot, MeterSnapshot};
use std::fmt::Write;

/// Human-readable metrics formatter
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter;

impl HumanFormatter {
    pub fn new() -> Self {
        Self
    }

    fn rates(snapshot: &MeterSnapshot) -> String {
        format!(
            "1m {} | 5m {} | 15m {} | mean {}",
            format_rate(snapshot.one_minute_rate),
            format_rate(snapshot.five_minute_rate),
            format_rate(snapshot.fifteen_minute_rate),
            format_rate(snapshot.mean_rate),
        )
    }
}

impl MetricsFormatter for HumanFormatter {
    fn format_ingest(&self, name: &str, snapshot: &IngestSnapshot) -> String {
        let mut output = format!(
            "[metrics] {}: submitted {} | ok {} | failed {} | in-flight {} ({} docs) | {}",
            name,
            format_count(non_negative(snapshot.submitted)),
            format_count(non_negative(snapshot.succeeded)),
            format_count(non_negative(snapshot.failed)),
            non_negative(snapshot.current_ingest),
            format_count(non_negative(snapshot.current_ingest_num_docs)),
            format_bytes(non_negative(snapshot.total_ingest_size_in_bytes)),
        );

        let _ = write!(
            output,
            "\n[metrics] {} rate: {}",
            name,
            Self::rates(&snapshot.total_ingest)
        );

        if !snapshot.bulk_collections.is_empty() {
            let _ = write!(output, " | bulk: {}", snapshot.bulk_collections.join(", "));
        }

        output
    }

    fn format_meter(&self, name: &str, snapshot: &MeterSnapshot) -> String {
        format!(
            "[metrics] {}: {} events | {}",
            name,
            format_count(snapshot.count),
            Self::rates(snapshot)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ingest() {
        let snapshot = IngestSnapshot {
            submitted: 12_000,
            succeeded: 11_997,
            failed: 3,
            total_ingest_size_in_bytes: 2048,
            bulk_collections: vec!["logs-10".into()],
            ..Default::default()
        };

        let output = HumanFormatter::new().format_ingest("ingest", &snapshot);
        assert!(output.contains("submitted 12.0K"));
        assert!(output.contains("failed 3"));
        assert!(output.contains("2.0 KB"));
        assert!(output.contains("bulk: logs-10"));
    }

    #[test]
    fn test_format_ingest_without_bulk() {
        let output = HumanFormatter::new().format_ingest("ingest", &IngestSnapshot::default());
        assert!(!output.contains("bulk:"));
    }

    #[test]
    fn test_format_meter() {
        let snapshot = MeterSnapshot {
            count: 1500,
            one_minute_rate: 100.0,
            ..Default::default()
        };
        let output = HumanFormatter::new().format_meter("import", &snapshot);
        assert!(output.contains("[metrics] import: 1.5K events"));
        assert!(output.contains("1m 100/s"));
    }
}
