//! PipelineExecutor - runs pipelines concurrently

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sluice_metrics::{
    DEFAULT_TICK_INTERVAL, HumanFormatter, MeterMetric, MeterSnapshot, MetricsFormatter,
};
use tokio::task::JoinHandle;

use crate::error::{PipelineError, Result};
use crate::listener::{ListenerError, Pipeline, RequestListener};
use crate::runner::{PipelineReport, PipelineRunner};

/// Name of the listener through which the executor meters requests
pub const EXECUTOR_METER_LISTENER: &str = "executor-meter";

type Provider<P> = Arc<dyn Fn() -> P + Send + Sync>;
type ReportSink = Arc<dyn Fn(&PipelineReport) + Send + Sync>;

/// Reports and failures of all pipelines of one execution
#[derive(Debug, Default)]
pub struct ExecutionSummary {
    pub reports: Vec<PipelineReport>,
    pub failures: Vec<PipelineError>,
    /// Requests across all pipelines
    pub meter: MeterSnapshot,
}

impl ExecutionSummary {
    pub fn requests(&self) -> u64 {
        self.reports.iter().map(|r| r.requests).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Render the request meter with the given formatter
    pub fn format_meter(&self, formatter: &dyn MetricsFormatter) -> String {
        formatter.format_meter(EXECUTOR_METER_LISTENER, &self.meter)
    }
}

/// Marks the executor's meter for each request of any pipeline
struct MeterListener(Arc<MeterMetric>);

#[async_trait]
impl<R, E> RequestListener<R, E> for MeterListener
where
    R: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    async fn new_request(&self, _request: &R) -> std::result::Result<(), ListenerError<E>> {
        self.0.mark(1);
        Ok(())
    }
}

/// Runs `concurrency` pipelines on tokio tasks
///
/// Each pipeline comes from the provider and runs in its own
/// [`PipelineRunner`]. Completed reports are handed to the sink (if any)
/// as soon as each pipeline finishes, and collected for [`wait_for`].
///
/// [`wait_for`]: PipelineExecutor::wait_for
///
/// # Example
///
/// ```ignore
/// let mut executor = PipelineExecutor::new(|| FilePipeline::new(paths.clone()))
///     .with_concurrency(4)
///     .with_sink(|report| tracing::info!(requests = report.requests, "done"));
///
/// executor.execute()?;
/// let summary = executor.wait_for(Duration::from_secs(60)).await?;
/// ```
pub struct PipelineExecutor<P: Pipeline> {
    concurrency: usize,
    tick_interval: Duration,
    provider: Provider<P>,
    sink: Option<ReportSink>,
    metric: Arc<MeterMetric>,
    tasks: Vec<JoinHandle<Result<PipelineReport>>>,
    summary: ExecutionSummary,
    executed: bool,
}

impl<P: Pipeline + 'static> PipelineExecutor<P> {
    pub fn new<F>(provider: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
    {
        Self {
            concurrency: 1,
            tick_interval: DEFAULT_TICK_INTERVAL,
            provider: Arc::new(provider),
            sink: None,
            metric: Arc::new(MeterMetric::new(DEFAULT_TICK_INTERVAL)),
            tasks: Vec::new(),
            summary: ExecutionSummary::default(),
            executed: false,
        }
    }

    /// Number of pipelines to run (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Tick interval for the executor's meter and every runner's meter
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self.metric = Arc::new(MeterMetric::new(tick_interval));
        self
    }

    /// Receive each report as its pipeline completes
    pub fn with_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&PipelineReport) + Send + Sync + 'static,
    {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Throughput across all pipelines
    pub fn meter(&self) -> MeterSnapshot {
        self.metric.snapshot()
    }

    /// Pipelines still running or not yet collected
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Spawn the pipelines on the current runtime
    pub fn execute(&mut self) -> Result<()> {
        if self.executed {
            return Err(PipelineError::AlreadyRun);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PipelineError::NoRuntime)?;
        self.executed = true;
        self.metric.start();

        tracing::info!(concurrency = self.concurrency, "starting pipelines");

        for worker_id in 0..self.concurrency {
            let mut runner =
                PipelineRunner::new((self.provider)()).with_tick_interval(self.tick_interval);
            runner.add_request_listener(
                EXECUTOR_METER_LISTENER,
                Arc::new(MeterListener(Arc::clone(&self.metric))),
            );
            let sink = self.sink.clone();

            self.tasks.push(runtime.spawn(async move {
                tracing::debug!(worker_id, "pipeline worker starting");
                let result = runner.call().await;
                if let (Ok(report), Some(sink)) = (&result, &sink) {
                    sink(report);
                }
                tracing::debug!(worker_id, "pipeline worker stopping");
                result
            }));
        }

        Ok(())
    }

    /// Wait until every pipeline has finished
    ///
    /// On timeout the pipelines keep running and `wait_for` may be called
    /// again; reports collected so far are kept.
    pub async fn wait_for(&mut self, timeout: Duration) -> Result<ExecutionSummary> {
        let deadline = tokio::time::Instant::now() + timeout;

        while let Some(task) = self.tasks.first_mut() {
            let joined = match tokio::time::timeout_at(deadline, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(
                        pending = self.tasks.len(),
                        ?timeout,
                        "pipelines still running"
                    );
                    return Err(PipelineError::Timeout(timeout));
                }
            };
            self.tasks.remove(0);

            match joined {
                Ok(Ok(report)) => self.summary.reports.push(report),
                Ok(Err(e)) => self.summary.failures.push(e),
                Err(e) => self
                    .summary
                    .failures
                    .push(PipelineError::TaskFailed(e.to_string())),
            }
        }

        self.metric.stop();
        let mut summary = std::mem::take(&mut self.summary);
        summary.meter = self.metric.snapshot();

        tracing::info!(
            pipelines = summary.reports.len(),
            failures = summary.failures.len(),
            requests = summary.requests(),
            "pipelines finished"
        );
        tracing::info!("{}", summary.format_meter(&HumanFormatter));

        Ok(summary)
    }
}

impl<P: Pipeline> fmt::Debug for PipelineExecutor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("concurrency", &self.concurrency)
            .field("pending", &self.tasks.len())
            .field("executed", &self.executed)
            .finish()
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod executor_test;
