//! Ingest metrics reporter
//!
//! Logs an [`IngestSnapshot`] at the configured interval until cancelled.

use crate::{HumanFormatter, IngestMetric, JsonFormatter, format::MetricsFormatter};
use sluice_config::{MetricsConfig, MetricsFormat};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Periodic reporter for one ingest metric
pub struct MetricsReporter {
    name: String,
    metric: Arc<IngestMetric>,
    formatter: Box<dyn MetricsFormatter>,
    interval: Duration,
    enabled: bool,
}

impl MetricsReporter {
    /// Create a reporter using the interval and format from config
    pub fn new(name: impl Into<String>, metric: Arc<IngestMetric>, config: &MetricsConfig) -> Self {
        let formatter: Box<dyn MetricsFormatter> = match config.format {
            MetricsFormat::Human => Box::new(HumanFormatter::new()),
            MetricsFormat::Json => Box::new(JsonFormatter::new()),
        };

        Self {
            name: name.into(),
            metric,
            formatter,
            interval: config.interval,
            enabled: config.enabled,
        }
    }

    /// Run the reporter until cancellation
    ///
    /// Returns immediately when reporting is disabled.
    pub async fn run(self, cancel: CancellationToken) {
        if !self.enabled || self.interval.is_zero() {
            return;
        }

        let mut ticker = interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            name = %self.name,
            interval_secs = self.interval.as_secs(),
            "metrics reporter started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break;
                }
                _ = ticker.tick() => {
                    info!("{}", self.render());
                }
            }
        }
    }

    /// Format the current snapshot
    pub fn render(&self) -> String {
        self.formatter
            .format_ingest(&self.name, &self.metric.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool, format: MetricsFormat) -> MetricsConfig {
        MetricsConfig {
            enabled,
            interval: Duration::from_millis(100),
            format,
            ..Default::default()
        }
    }

    #[test]
    fn test_render_human() {
        let metric = Arc::new(IngestMetric::default());
        metric.submitted().inc_by(5);

        let reporter = MetricsReporter::new("ingest", metric, &config(true, MetricsFormat::Human));
        assert!(reporter.render().contains("submitted 5"));
    }

    #[test]
    fn test_render_json() {
        let metric = Arc::new(IngestMetric::default());
        let reporter = MetricsReporter::new("ingest", metric, &config(true, MetricsFormat::Json));
        assert!(reporter.render().starts_with('{'));
    }

    #[tokio::test]
    async fn test_run_disabled() {
        let metric = Arc::new(IngestMetric::default());
        let reporter = MetricsReporter::new("ingest", metric, &config(false, MetricsFormat::Human));

        // Should return immediately when disabled
        reporter.run(CancellationToken::new()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cancellation() {
        let metric = Arc::new(IngestMetric::default());
        let reporter = MetricsReporter::new("ingest", metric, &config(true, MetricsFormat::Human));
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(350)).await;
            cancel_clone.cancel();
        });

        // Should exit when cancelled
        reporter.run(cancel).await;
    }
}
