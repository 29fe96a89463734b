//! Worker execution loop

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use crate::client::JobClient;
use crate::harness::{CancelFlag, JobOutcome};
use crate::sampling::PayloadSampler;

use super::stats::WorkerStats;

/// Worker loop: claim slot -> sample payload -> run job -> report outcome.
///
/// Workers share the job client, sampler, semaphore and slot counter via
/// `Arc`; each outcome is sent to the aggregation channel, successes and
/// failures alike, so a single collector sees every resolution.
pub struct Worker {
    /// Unique worker identifier within the batch.
    id: usize,

    /// Protocol client (shared across workers).
    client: Arc<JobClient>,

    /// Payload selection (shared across workers).
    sampler: Arc<dyn PayloadSampler>,

    /// Channel sender for job outcomes.
    outcome_tx: mpsc::Sender<JobOutcome>,

    /// Concurrency limiter (shared semaphore).
    semaphore: Arc<Semaphore>,

    /// Cooperative cancellation flag.
    cancel: CancelFlag,

    /// Shared slot counter; claiming stops at `total_slots`.
    slot_counter: Arc<AtomicUsize>,

    /// Batch size.
    total_slots: usize,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        id: usize,
        client: Arc<JobClient>,
        sampler: Arc<dyn PayloadSampler>,
        outcome_tx: mpsc::Sender<JobOutcome>,
        semaphore: Arc<Semaphore>,
        cancel: CancelFlag,
        slot_counter: Arc<AtomicUsize>,
        total_slots: usize,
    ) -> Self {
        Self {
            id,
            client,
            sampler,
            outcome_tx,
            semaphore,
            cancel,
            slot_counter,
            total_slots,
        }
    }

    /// Run the worker until the batch is exhausted or cancellation is
    /// requested. Returns the worker's statistics.
    pub async fn run(self) -> WorkerStats {
        let mut stats = WorkerStats::new();
        stats.start();

        tracing::debug!(worker_id = self.id, "worker started");

        loop {
            // Cancellation blocks admission of new slots; the job that was
            // in flight when the flag flipped has already resolved by now.
            if self.cancel.is_cancelled() {
                tracing::debug!(worker_id = self.id, "cancellation requested, worker stopping");
                break;
            }

            if !self.try_claim_slot() {
                tracing::debug!(worker_id = self.id, "no more slots to claim, worker stopping");
                break;
            }

            let permit = match self.semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => break, // semaphore closed, harness is gone
            };

            let payload = self.sampler.sample();
            let outcome = match self.client.run(&payload, &self.cancel).await {
                Ok(success) => {
                    stats.record_success(success.metrics.poll_count);
                    JobOutcome::Success(success)
                }
                Err(error) => {
                    stats.record_error();
                    tracing::warn!(
                        worker_id = self.id,
                        kind = error.kind(),
                        error = %error,
                        "job failed"
                    );
                    JobOutcome::Failure {
                        kind: error.kind(),
                        message: error.to_string(),
                    }
                }
            };
            drop(permit);

            if self.outcome_tx.send(outcome).await.is_err() {
                tracing::debug!(worker_id = self.id, "outcome channel closed, worker stopping");
                break;
            }
        }

        stats.stop();
        tracing::debug!(
            worker_id = self.id,
            completed = stats.completed,
            errors = stats.errors,
            elapsed_ms = stats.elapsed().map(|d| d.as_millis() as u64),
            "worker finished"
        );

        stats
    }

    /// Atomically claim the next job slot.
    ///
    /// Returns `false` once the batch is exhausted. The counter is rolled
    /// back on over-claim so concurrent workers near the limit stay
    /// accurate.
    fn try_claim_slot(&self) -> bool {
        let claimed = self.slot_counter.fetch_add(1, Ordering::SeqCst);
        if claimed >= self.total_slots {
            self.slot_counter.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// The worker identifier.
    pub fn id(&self) -> usize {
        self.id
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("total_slots", &self.total_slots)
            .finish()
    }
}
