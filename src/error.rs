//! Error types for routeload

use thiserror::Error;

/// Errors produced at the network layer.
///
/// The transport owns its own retry budget; once one of these surfaces,
/// nothing above the transport retries again.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Low-level connection failure (DNS, TCP, TLS, timeout).
    #[error("connection failed: {message}")]
    Connection {
        /// Human-readable cause from the underlying HTTP client.
        message: String,
    },

    /// The retry budget was exhausted without a non-retriable response.
    #[error("retries exhausted after {attempts} attempts (last status: {last_status:?})")]
    RetriesExhausted {
        /// Total attempts made, including the initial one.
        attempts: u32,
        /// Status code of the last retriable response, if the final failure
        /// was an HTTP status rather than a connection error.
        last_status: Option<u16>,
    },
}

/// Classified failure of a single job lifecycle.
#[derive(Debug, Error)]
pub enum JobError {
    /// Network-layer failure, already past the transport's retry budget.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Terminal non-2xx status that is not in the retriable set.
    #[error("HTTP error with status {status}: {body}")]
    Http {
        /// Response status code.
        status: u16,
        /// Response body text, for diagnostics.
        body: String,
    },

    /// The response shape violated the submit/poll protocol. Never retried:
    /// a contract violation, not transience.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The configured poll ceiling was reached while the job was still
    /// reported as processing.
    #[error("poll limit of {limit} reached without resolution")]
    PollLimit {
        /// The configured maximum number of polls.
        limit: u32,
    },

    /// The harness was cancelled while this job was in flight.
    #[error("job cancelled")]
    Cancelled,
}

impl JobError {
    /// Short classification label used in structured log events.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Transport(_) => "transport",
            JobError::Http { .. } => "http",
            JobError::Protocol(_) => "protocol",
            JobError::PollLimit { .. } => "poll_limit",
            JobError::Cancelled => "cancelled",
        }
    }
}

/// Harness-level errors.
///
/// Only misconfiguration and task-join failures surface here; per-job
/// failures are isolated and reported through the [`LoadRun`] summary
/// instead.
///
/// [`LoadRun`]: crate::harness::LoadRun
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required component was not supplied to a builder.
    #[error("missing component: {0}")]
    MissingComponent(&'static str),

    /// A worker task panicked or was aborted.
    #[error("worker task failed: {0}")]
    Join(String),
}

impl HarnessError {
    /// Construct a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        HarnessError::Config(message.into())
    }

    /// Construct a missing-component error.
    pub fn missing(component: &'static str) -> Self {
        HarnessError::MissingComponent(component)
    }
}

/// Result alias for harness operations.
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;
