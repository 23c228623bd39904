//! PipelineRunner - drives one pipeline to completion

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sluice_metrics::{DEFAULT_TICK_INTERVAL, MeterMetric, MeterSnapshot};
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, Result};
use crate::listener::{ErrorListener, ListenerError, Pipeline, RequestListener};

/// Lifecycle of a runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    Running,
    Completed,
    Aborted,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Requests pulled from the pipeline
    pub requests: u64,
    /// Recoverable errors routed to the error chain
    pub errors: u64,
    pub state: PipelineState,
    pub elapsed: Duration,
    /// Request throughput over the run
    pub meter: MeterSnapshot,
}

/// Listeners keyed by name, invoked in registration order
struct ListenerChain<T: ?Sized> {
    entries: Vec<(String, Arc<T>)>,
}

impl<T: ?Sized> ListenerChain<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register under `name`, replacing in place if the name is taken
    fn insert(&mut self, name: String, listener: Arc<T>) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = listener,
            None => self.entries.push((name, listener)),
        }
    }

    fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| n != name);
        self.entries.len() != before
    }

    fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Clone the handles so the chain can be walked while the pipeline is
    /// borrowed mutably
    fn handles(&self) -> Vec<Arc<T>> {
        self.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
    }
}

type RequestChain<P> =
    ListenerChain<dyn RequestListener<<P as Pipeline>::Request, <P as Pipeline>::Error>>;
type ErrorChain<P> =
    ListenerChain<dyn ErrorListener<<P as Pipeline>::Request, <P as Pipeline>::Error>>;

/// Runs a [`Pipeline`] through its listener chains
///
/// # Design
///
/// - Each request goes through the request chain, then to the pipeline
/// - A `Recoverable` error from any of them goes through the error chain,
///   then to the pipeline; the remaining request listeners still run
/// - A `Fatal` error stops the run, the pipeline is not closed
/// - A [`MeterMetric`] is ticking for exactly the duration of `call()`
///
/// A runner runs once. Cancellation is only observed before the run starts.
pub struct PipelineRunner<P: Pipeline> {
    pipeline: P,
    request_listeners: RequestChain<P>,
    error_listeners: ErrorChain<P>,
    state: PipelineState,
    cancel: CancellationToken,
    metric: MeterMetric,
}

impl<P: Pipeline> PipelineRunner<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            request_listeners: ListenerChain::new(),
            error_listeners: ListenerChain::new(),
            state: PipelineState::Created,
            cancel: CancellationToken::new(),
            metric: MeterMetric::new(DEFAULT_TICK_INTERVAL),
        }
    }

    /// Set the tick interval of the run's meter
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.metric = MeterMetric::new(tick_interval);
        self
    }

    /// Register a request listener
    ///
    /// Re-registering a name replaces the listener but keeps its position.
    pub fn add_request_listener(
        &mut self,
        name: impl Into<String>,
        listener: Arc<dyn RequestListener<P::Request, P::Error>>,
    ) -> &mut Self {
        self.request_listeners.insert(name.into(), listener);
        self
    }

    /// Register an error listener
    ///
    /// Re-registering a name replaces the listener but keeps its position.
    pub fn add_error_listener(
        &mut self,
        name: impl Into<String>,
        listener: Arc<dyn ErrorListener<P::Request, P::Error>>,
    ) -> &mut Self {
        self.error_listeners.insert(name.into(), listener);
        self
    }

    pub fn remove_request_listener(&mut self, name: &str) -> bool {
        self.request_listeners.remove(name)
    }

    pub fn remove_error_listener(&mut self, name: &str) -> bool {
        self.error_listeners.remove(name)
    }

    pub fn request_listener_names(&self) -> Vec<&str> {
        self.request_listeners.names()
    }

    pub fn error_listener_names(&self) -> Vec<&str> {
        self.error_listeners.names()
    }

    /// Token that stops the runner if cancelled before `call()`
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[inline]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn into_pipeline(self) -> P {
        self.pipeline
    }

    /// Current throughput of the run
    pub fn meter(&self) -> MeterSnapshot {
        self.metric.snapshot()
    }

    /// Pull every request through the chains
    pub async fn call(&mut self) -> Result<PipelineReport> {
        if self.state != PipelineState::Created {
            return Err(PipelineError::AlreadyRun);
        }
        if self.cancel.is_cancelled() {
            self.state = PipelineState::Aborted;
            return Err(PipelineError::Cancelled);
        }

        self.state = PipelineState::Running;
        self.metric.start();
        let started = Instant::now();

        let requests = self.request_listeners.handles();
        let errors = self.error_listeners.handles();
        let mut processed = 0u64;
        let mut failed = 0u64;

        while let Some(request) = self.pipeline.next_request().await {
            processed += 1;

            for listener in &requests {
                let result = listener.new_request(&request).await;
                failed += self.settle(&errors, &request, result, processed).await?;
            }
            let result = self.pipeline.new_request(&request).await;
            failed += self.settle(&errors, &request, result, processed).await?;

            self.metric.mark(1);
        }

        self.pipeline.close().await;
        self.metric.stop();
        self.state = PipelineState::Completed;

        tracing::debug!(requests = processed, errors = failed, "pipeline completed");

        Ok(PipelineReport {
            requests: processed,
            errors: failed,
            state: self.state,
            elapsed: started.elapsed(),
            meter: self.metric.snapshot(),
        })
    }

    /// Route a listener result, returning the number of recoverable errors
    async fn settle(
        &mut self,
        errors: &[Arc<dyn ErrorListener<P::Request, P::Error>>],
        request: &P::Request,
        result: std::result::Result<(), ListenerError<P::Error>>,
        processed: u64,
    ) -> Result<u64> {
        match result {
            Ok(()) => Ok(0),
            Err(ListenerError::Recoverable(error)) => {
                for listener in errors {
                    listener.error(request, &error).await;
                }
                self.pipeline.error(request, &error).await;
                Ok(1)
            }
            Err(ListenerError::Fatal(reason)) => {
                self.metric.stop();
                self.state = PipelineState::Aborted;
                tracing::warn!(requests = processed, %reason, "pipeline aborted");
                Err(PipelineError::aborted(processed, reason))
            }
        }
    }
}

impl<P: Pipeline> fmt::Debug for PipelineRunner<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("state", &self.state)
            .field("request_listeners", &self.request_listeners.names())
            .field("error_listeners", &self.error_listeners.names())
            .finish()
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod runner_test;
