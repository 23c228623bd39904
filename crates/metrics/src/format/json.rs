//! JSON metrics formatter
//!
//! # Example Output
//!
//! ```json
//! {"type":"ingest","name":"ingest","submitted":12000,"succeeded":11997,...}
//! ```

use super::MetricsFormatter;
use crate::{IngestSnapshot, MeterSnapshot};
use serde::Serialize;

/// JSON metrics formatter
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct Report<'a, T: Serialize> {
    #[serde(rename = "type")]
    report_type: &'static str,
    name: &'a str,
    #[serde(flatten)]
    snapshot: &'a T,
}

fn to_json<T: Serialize>(report_type: &'static str, name: &str, snapshot: &T) -> String {
    let report = Report {
        report_type,
        name,
        snapshot,
    };
    serde_json::to_string(&report).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

impl MetricsFormatter for JsonFormatter {
    fn format_ingest(&self, name: &str, snapshot: &IngestSnapshot) -> String {
        to_json("ingest", name, snapshot)
    }

    fn format_meter(&self, name: &str, snapshot: &MeterSnapshot) -> String {
        to_json("meter", name, snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ingest_is_valid_json() {
        let snapshot = IngestSnapshot {
            submitted: 10,
            failed: 1,
            ..Default::default()
        };
        let output = JsonFormatter::new().format_ingest("bulk", &snapshot);

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["type"], "ingest");
        assert_eq!(value["name"], "bulk");
        assert_eq!(value["submitted"], 10);
        assert_eq!(value["failed"], 1);
        assert!(value["total_ingest"]["one_minute_rate"].is_number());
    }

    #[test]
    fn test_format_meter_is_valid_json() {
        let snapshot = MeterSnapshot {
            count: 7,
            ..Default::default()
        };
        let output = JsonFormatter::new().format_meter("import", &snapshot);

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["type"], "meter");
        assert_eq!(value["count"], 7);
    }
}
