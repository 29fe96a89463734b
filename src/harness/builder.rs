//! Builder pattern for Harness construction

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::client::JobClient;
use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::sampling::PayloadSampler;

use super::aggregator::JobOutcome;
use super::executor::Harness;

/// Builder for creating a [`Harness`] together with its outcome receiver.
///
/// # Example
///
/// ```ignore
/// let (harness, outcome_rx) = HarnessBuilder::new()
///     .config(HarnessConfig::new(100, 10))
///     .client(client)
///     .sampler(sampler)
///     .build()?;
/// ```
pub struct HarnessBuilder {
    config: HarnessConfig,
    client: Option<Arc<JobClient>>,
    sampler: Option<Arc<dyn PayloadSampler>>,
}

impl HarnessBuilder {
    /// Create a builder with the default (single-job) configuration.
    pub fn new() -> Self {
        Self {
            config: HarnessConfig::default(),
            client: None,
            sampler: None,
        }
    }

    /// Set the full batch configuration.
    pub fn config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of requests.
    pub fn num_requests(mut self, num_requests: usize) -> Self {
        self.config.num_requests = num_requests;
        self
    }

    /// Set the concurrency ceiling.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
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

    /// Build the harness and the receiving end of its outcome channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the client or sampler are missing, the
    /// configuration is invalid, or the payload set is empty.
    pub fn build(self) -> HarnessResult<(Harness, mpsc::Receiver<JobOutcome>)> {
        let client = self.client.ok_or(HarnessError::missing("client"))?;
        let sampler = self.sampler.ok_or(HarnessError::missing("sampler"))?;

        self.config.validate()?;
        if sampler.is_empty() {
            return Err(HarnessError::config("payload set must not be empty"));
        }

        // Sized for the whole batch so workers never block on reporting.
        let (outcome_tx, outcome_rx) = mpsc::channel(self.config.num_requests);

        let harness = Harness::new(self.config, client, sampler, outcome_tx);
        Ok((harness, outcome_rx))
    }
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}
