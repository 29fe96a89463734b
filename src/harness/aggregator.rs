//! Outcome collection and batch summary

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::client::JobSuccess;
use crate::error::{HarnessError, HarnessResult};

use super::executor::Harness;

/// Terminal resolution of one job slot, as reported to the aggregator.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    /// The job resolved with a parsed result body.
    Success(JobSuccess),

    /// The job failed; the error itself was already logged by the worker.
    Failure {
        /// Classification label (`transport`, `http`, `protocol`, ...).
        kind: &'static str,
        /// Rendered error message.
        message: String,
    },
}

/// Summary of a completed (or cancelled) batch.
#[derive(Debug)]
pub struct LoadRun {
    /// Requested number of job lifecycles.
    pub requested: usize,

    /// Configured concurrency ceiling.
    pub concurrency: usize,

    /// Successful outcomes, in completion order.
    pub successes: Vec<JobSuccess>,

    /// Number of failed jobs.
    pub failures: usize,

    /// Wall time of the batch.
    pub elapsed: Duration,
}

impl LoadRun {
    /// Total resolved slots (successes + failures). Less than `requested`
    /// only when the batch was cancelled.
    pub fn total_outcomes(&self) -> usize {
        self.successes.len() + self.failures
    }

    /// Success rate over resolved slots, 0.0 - 1.0.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_outcomes();
        if total == 0 {
            0.0
        } else {
            self.successes.len() as f64 / total as f64
        }
    }

    /// Resolved jobs per second over the batch wall time.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_outcomes() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Drain the outcome channel until it closes, logging batch progress.
///
/// Returns the collected successes and the failure count. This is the
/// single aggregation point: no worker ever touches the result collection
/// directly.
pub async fn collect_outcomes(
    mut outcome_rx: mpsc::Receiver<JobOutcome>,
    total: usize,
) -> (Vec<JobSuccess>, usize) {
    let mut successes = Vec::new();
    let mut failures = 0usize;

    while let Some(outcome) = outcome_rx.recv().await {
        match outcome {
            JobOutcome::Success(success) => successes.push(success),
            JobOutcome::Failure { kind, message } => {
                failures += 1;
                tracing::debug!(kind, message = %message, "recorded job failure");
            }
        }
        tracing::info!(
            completed = successes.len() + failures,
            total,
            "batch progress"
        );
    }

    (successes, failures)
}

/// Run a harness to completion and aggregate its outcomes into a
/// [`LoadRun`].
///
/// With a `timeout`, the batch is cancelled once the deadline passes:
/// in-flight jobs finish their current network call, no new slots are
/// admitted, and everything already resolved is still returned.
pub async fn drive(
    harness: Harness,
    outcome_rx: mpsc::Receiver<JobOutcome>,
    timeout: Option<Duration>,
) -> HarnessResult<LoadRun> {
    let requested = harness.config().num_requests;
    let concurrency = harness.config().concurrency;

    let collector = tokio::spawn(collect_outcomes(outcome_rx, requested));

    let start = Instant::now();
    let worker_stats = match timeout {
        Some(timeout) => harness.run_with_timeout(timeout).await?,
        None => harness.run().await?,
    };
    let elapsed = start.elapsed();

    // The harness holds the last sender; dropping it closes the channel
    // and lets the collector drain to completion.
    drop(harness);

    let (successes, failures) = collector
        .await
        .map_err(|e| HarnessError::Join(e.to_string()))?;

    let total_polls: usize = worker_stats.iter().map(|s| s.polls).sum();
    tracing::info!(
        requested,
        successes = successes.len(),
        failures,
        total_polls,
        elapsed_secs = elapsed.as_secs_f64(),
        "batch finished"
    );

    Ok(LoadRun {
        requested,
        concurrency,
        successes,
        failures,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::JobMetrics;

    fn success() -> JobSuccess {
        JobSuccess {
            body: serde_json::json!({"status": "done"}),
            metrics: JobMetrics {
                duration: Duration::from_millis(25),
                poll_count: 2,
                status_code: 200,
                response_size: 17,
            },
            completed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_load_run_rates() {
        let run = LoadRun {
            requested: 10,
            concurrency: 3,
            successes: vec![success(), success()],
            failures: 2,
            elapsed: Duration::from_secs(2),
        };

        assert_eq!(run.total_outcomes(), 4);
        assert!((run.success_rate() - 0.5).abs() < 0.001);
        assert!((run.throughput() - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_load_run_empty() {
        let run = LoadRun {
            requested: 10,
            concurrency: 3,
            successes: Vec::new(),
            failures: 0,
            elapsed: Duration::ZERO,
        };
        assert_eq!(run.success_rate(), 0.0);
        assert_eq!(run.throughput(), 0.0);
    }

    #[tokio::test]
    async fn test_collect_outcomes_counts_both_kinds() {
        let (tx, rx) = mpsc::channel(8);

        tx.send(JobOutcome::Success(success())).await.unwrap();
        tx.send(JobOutcome::Failure {
            kind: "http",
            message: "HTTP error with status 400".into(),
        })
        .await
        .unwrap();
        tx.send(JobOutcome::Success(success())).await.unwrap();
        drop(tx);

        let (successes, failures) = collect_outcomes(rx, 3).await;
        assert_eq!(successes.len(), 2);
        assert_eq!(failures, 1);
    }
}
