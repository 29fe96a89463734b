//! Builder pattern for Worker construction

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use crate::client::JobClient;
use crate::error::{HarnessError, HarnessResult};
use crate::harness::{CancelFlag, JobOutcome};
use crate::sampling::PayloadSampler;

use super::executor::Worker;

/// Builder for creating [`Worker`] instances with validation.
pub struct WorkerBuilder {
    id: usize,
    client: Option<Arc<JobClient>>,
    sampler: Option<Arc<dyn PayloadSampler>>,
    outcome_tx: Option<mpsc::Sender<JobOutcome>>,
    semaphore: Option<Arc<Semaphore>>,
    cancel: CancelFlag,
    slot_counter: Option<Arc<AtomicUsize>>,
    total_slots: Option<usize>,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID.
    pub fn new(id: usize) -> Self {
        Self {
            id,
            client: None,
            sampler: None,
            outcome_tx: None,
            semaphore: None,
            cancel: CancelFlag::new(),
            slot_counter: None,
            total_slots: None,
        }
    }

    /// Set the shared job client.
    pub fn client(mut self, client: Arc<JobClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the payload sampler.
    pub fn sampler(mut self, sampler: Arc<dyn PayloadSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Set the outcome channel sender.
    pub fn outcome_tx(mut self, tx: mpsc::Sender<JobOutcome>) -> Self {
        self.outcome_tx = Some(tx);
        self
    }

    /// Set the concurrency semaphore.
    pub fn semaphore(mut self, semaphore: Arc<Semaphore>) -> Self {
        self.semaphore = Some(semaphore);
        self
    }

    /// Set the cancellation flag.
    pub fn cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set the shared slot counter and batch size.
    pub fn slots(mut self, counter: Arc<AtomicUsize>, total: usize) -> Self {
        self.slot_counter = Some(counter);
        self.total_slots = Some(total);
        self
    }

    /// Build the worker.
    ///
    /// # Errors
    /// Returns an error if any required component is missing.
    pub fn build(self) -> HarnessResult<Worker> {
        let client = self.client.ok_or(HarnessError::missing("client"))?;
        let sampler = self.sampler.ok_or(HarnessError::missing("sampler"))?;
        let outcome_tx = self.outcome_tx.ok_or(HarnessError::missing("outcome_tx"))?;
        let semaphore = self.semaphore.ok_or(HarnessError::missing("semaphore"))?;
        let slot_counter = self.slot_counter.ok_or(HarnessError::missing("slot_counter"))?;
        let total_slots = self.total_slots.ok_or(HarnessError::missing("total_slots"))?;

        Ok(Worker::new(
            self.id,
            client,
            sampler,
            outcome_tx,
            semaphore,
            self.cancel,
            slot_counter,
            total_slots,
        ))
    }
}
