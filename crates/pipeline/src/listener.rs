//! Pipeline and listener traits

use async_trait::async_trait;
use std::fmt;

/// Error a request listener hands back to the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerError<E> {
    /// Routed to the error-listener chain; the run continues
    Recoverable(E),
    /// Stops the run
    Fatal(String),
}

impl<E> ListenerError<E> {
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal(reason.into())
    }
}

impl<E: fmt::Display> fmt::Display for ListenerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable(e) => write!(f, "{}", e),
            Self::Fatal(reason) => write!(f, "fatal: {}", reason),
        }
    }
}

/// A source of requests that handles them itself
///
/// The pipeline is the last listener in both chains of its
/// [`PipelineRunner`](crate::PipelineRunner): `new_request` runs after every
/// named request listener, `error` after every named error listener.
#[async_trait]
pub trait Pipeline: Send {
    type Request: Send + Sync + 'static;
    type Error: Send + Sync + 'static;

    /// Next unit of work, `None` when exhausted
    async fn next_request(&mut self) -> Option<Self::Request>;

    async fn new_request(
        &mut self,
        request: &Self::Request,
    ) -> Result<(), ListenerError<Self::Error>>;

    async fn error(&mut self, request: &Self::Request, error: &Self::Error);

    /// Called once after the last request of a completed run
    async fn close(&mut self) {}
}

/// Named listener invoked for every request
#[async_trait]
pub trait RequestListener<R, E>: Send + Sync {
    async fn new_request(&self, request: &R) -> Result<(), ListenerError<E>>;
}

/// Named listener invoked for every recoverable error
#[async_trait]
pub trait ErrorListener<R, E>: Send + Sync {
    async fn error(&self, request: &R, error: &E);
}
