//! Sluice - Pipeline
//!
//! Pull-based request pipelines with ordered listener chains.
//!
//! # Architecture
//!
//! ```text
//!                       ┌─→ request listeners (by name, in order) ─→ pipeline.new_request
//! pipeline.next_request ┤
//!                       └─ Recoverable ─→ error listeners (in order) ─→ pipeline.error
//!                          Fatal ───────→ abort
//! ```
//!
//! # Key Design
//!
//! - **Single run**: a [`PipelineRunner`] goes `Created → Running →
//!   Completed | Aborted` exactly once
//! - **Named chains**: listeners are keyed by name, order of first
//!   registration is invocation order
//! - **Metered**: every run owns a [`MeterMetric`](sluice_metrics::MeterMetric)
//!   that ticks only while `call()` runs
//! - **Executor**: [`PipelineExecutor`] runs several pipelines on tokio
//!   tasks and meters requests across all of them
//!
//! # Example
//!
//! ```ignore
//! let mut runner = PipelineRunner::new(LinePipeline::new(lines));
//! runner.add_request_listener("audit", Arc::new(AuditListener::default()));
//! let report = runner.call().await?;
//! ```

mod error;
mod executor;
mod listener;
mod runner;

pub use error::{PipelineError, Result};
pub use executor::{EXECUTOR_METER_LISTENER, ExecutionSummary, PipelineExecutor};
pub use listener::{ErrorListener, ListenerError, Pipeline, RequestListener};
pub use runner::{PipelineReport, PipelineRunner, PipelineState};
