//! Load harness: batch execution of job lifecycles
//!
//! The harness runs N job lifecycles under a concurrency ceiling C:
//! min(C, N) worker tasks claim slots from a shared counter, so admission
//! is completion-driven rather than wave-based, and every resolution flows
//! over an mpsc channel to a single aggregation point. A single job's
//! failure never aborts its siblings.
//!
//! # Example
//!
//! ```ignore
//! use routeload::harness::{drive, HarnessBuilder};
//!
//! let (harness, outcome_rx) = HarnessBuilder::new()
//!     .config(HarnessConfig::new(100, 10))
//!     .client(client)
//!     .sampler(sampler)
//!     .build()?;
//!
//! let run = drive(harness, outcome_rx, None).await?;
//! println!("{} succeeded, {} failed", run.successes.len(), run.failures);
//! ```

mod aggregator;
mod builder;
mod executor;

pub use aggregator::{collect_outcomes, drive, JobOutcome, LoadRun};
pub use builder::HarnessBuilder;
pub use executor::Harness;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared by the harness, its workers and
/// every in-flight job.
///
/// Cancellation is observed only between network calls: an in-flight call
/// always finishes, no new slots are admitted afterwards.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a flag in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
