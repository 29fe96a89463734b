//! Harness execution logic

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};

use crate::client::JobClient;
use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::sampling::PayloadSampler;
use crate::worker::{WorkerBuilder, WorkerStats};

use super::aggregator::JobOutcome;
use super::CancelFlag;

/// Manages one batch: spawns workers, coordinates cancellation, and
/// collects worker statistics.
pub struct Harness {
    pub(crate) config: HarnessConfig,
    pub(crate) client: Arc<JobClient>,
    pub(crate) sampler: Arc<dyn PayloadSampler>,
    pub(crate) outcome_tx: mpsc::Sender<JobOutcome>,
    pub(crate) semaphore: Arc<Semaphore>,
    pub(crate) cancel: CancelFlag,
    pub(crate) slot_counter: Arc<AtomicUsize>,
}

impl Harness {
    /// Create a new harness. Use [`HarnessBuilder`](super::HarnessBuilder)
    /// for validated construction.
    pub fn new(
        config: HarnessConfig,
        client: Arc<JobClient>,
        sampler: Arc<dyn PayloadSampler>,
        outcome_tx: mpsc::Sender<JobOutcome>,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.concurrency));
        Self {
            config,
            client,
            sampler,
            outcome_tx,
            semaphore,
            cancel: CancelFlag::new(),
            slot_counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The batch configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// A handle to the cancellation flag, e.g. for external signal
    /// handling.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Request cancellation: no new slots are admitted, in-flight jobs
    /// finish their current network call.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Run the batch: spawn workers, wait for all of them, return their
    /// statistics.
    pub async fn run(&self) -> HarnessResult<Vec<WorkerStats>> {
        let worker_count = self.config.worker_count();

        tracing::info!(
            num_requests = self.config.num_requests,
            concurrency = self.config.concurrency,
            workers = worker_count,
            payloads = self.sampler.len(),
            "starting load run"
        );

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let worker = WorkerBuilder::new(worker_id)
                .client(Arc::clone(&self.client))
                .sampler(Arc::clone(&self.sampler))
                .outcome_tx(self.outcome_tx.clone())
                .semaphore(Arc::clone(&self.semaphore))
                .cancel(self.cancel.clone())
                .slots(Arc::clone(&self.slot_counter), self.config.num_requests)
                .build()?;

            handles.push(tokio::spawn(worker.run()));
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut join_failures = 0;
        for (worker_id, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(stats) => {
                    tracing::debug!(
                        worker_id,
                        completed = stats.completed,
                        errors = stats.errors,
                        "worker joined"
                    );
                    results.push(stats);
                }
                Err(e) => {
                    join_failures += 1;
                    tracing::error!(worker_id, error = %e, "worker task panicked");
                }
            }
        }

        if results.is_empty() && join_failures > 0 {
            return Err(HarnessError::Join(format!(
                "all {join_failures} workers failed to complete"
            )));
        }

        let completed: usize = results.iter().map(|s| s.completed).sum();
        let errors: usize = results.iter().map(|s| s.errors).sum();
        tracing::info!(completed, errors, "all workers finished");

        Ok(results)
    }

    /// Run with a deadline: once it passes, cancellation is requested and
    /// the batch winds down.
    pub async fn run_with_timeout(&self, timeout: Duration) -> HarnessResult<Vec<WorkerStats>> {
        let cancel = self.cancel.clone();
        let timeout_handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::info!("timeout reached, cancelling batch");
            cancel.cancel();
        });

        let result = self.run().await;
        timeout_handle.abort();
        result
    }

    /// Run with Ctrl+C handling: the first signal cancels the batch
    /// gracefully.
    pub async fn run_with_signal_handling(&self) -> HarnessResult<Vec<WorkerStats>> {
        let cancel = self.cancel.clone();
        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("received Ctrl+C, cancelling batch");
                    cancel.cancel();
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to listen for Ctrl+C");
                }
            }
        });

        let result = self.run().await;
        signal_handle.abort();
        result
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("config", &self.config)
            .field("payloads", &self.sampler.len())
            .finish()
    }
}
