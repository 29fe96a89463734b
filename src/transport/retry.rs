//! Retry policy and retrying transport wrapper

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::TransportError;

use super::{HttpTransport, TransportRequest, TransportResponse};

/// Status codes retried by default: server overload and gateway errors.
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Exponential-backoff retry policy for transient failures.
///
/// The wait before retry `n` (1-based) is `backoff_factor * 2^(n-1)`
/// seconds. Only connection failures and the configured status set are
/// retried; everything else passes through on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt.
    pub max_retries: u32,

    /// Backoff multiplier in seconds.
    pub backoff_factor: f64,

    /// Retriable status codes.
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 0.3,
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the default retriable status set.
    pub fn new(max_retries: u32, backoff_factor: f64) -> Self {
        Self {
            max_retries,
            backoff_factor,
            ..Default::default()
        }
    }

    /// Also retry 404 responses, for servers where the status resource is
    /// only eventually consistent with the accepted job.
    pub fn tolerate_not_found(mut self) -> Self {
        if !self.retry_statuses.contains(&404) {
            self.retry_statuses.push(404);
        }
        self
    }

    /// Whether a response status should be retried.
    pub fn is_retriable(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }

    /// Backoff before the given retry (1-based).
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = self.backoff_factor.max(0.0);
        Duration::from_secs_f64(factor * f64::from(1u32 << (retry.saturating_sub(1)).min(31)))
    }
}

/// Transport wrapper applying a [`RetryPolicy`] to an inner transport.
pub struct RetryingTransport {
    inner: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl RetryingTransport {
    /// Wrap a transport with the given policy.
    pub fn new(inner: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The configured policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl HttpTransport for RetryingTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut last_status = None;

        for attempt in 1..=self.policy.max_retries + 1 {
            match self.inner.send(request).await {
                Ok(response) if self.policy.is_retriable(response.status) => {
                    last_status = Some(response.status.as_u16());
                    tracing::debug!(
                        url = %request.url,
                        status = response.status.as_u16(),
                        attempt,
                        "retriable status, backing off"
                    );
                }
                Ok(response) => return Ok(response),
                Err(TransportError::Connection { message }) => {
                    last_status = None;
                    tracing::debug!(
                        url = %request.url,
                        error = %message,
                        attempt,
                        "connection failure, backing off"
                    );
                }
                Err(other) => return Err(other),
            }

            if attempt <= self.policy.max_retries {
                tokio::time::sleep(self.policy.backoff_delay(attempt)).await;
            }
        }

        Err(TransportError::RetriesExhausted {
            attempts: self.policy.max_retries + 1,
            last_status,
        })
    }
}
