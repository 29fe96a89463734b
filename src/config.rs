//! Job and harness configuration types

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Response header carrying the server-assigned job identifier on a 202.
pub const DEFAULT_JOB_ID_HEADER: &str = "NVCF-REQID";

/// Shared per-job configuration.
///
/// One instance is constructed up front and shared read-only across every
/// job lifecycle in a batch. The submission URL, header set and delays never
/// change mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Submission endpoint URL.
    pub url: String,

    /// Template for the status-polling URL. If it contains the literal
    /// `{request_id}` the identifier is substituted, otherwise the identifier
    /// is appended. Required for any job the server answers with 202.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_url_template: Option<String>,

    /// Response header the job identifier is read from on acceptance.
    pub job_id_header: String,

    /// Request headers sent with every submission and poll.
    pub headers: HashMap<String, String>,

    /// Courtesy delay applied before every network call, submission and
    /// polls alike.
    pub request_delay: Duration,

    /// Optional ceiling on the number of status polls per job. `None`
    /// leaves the loop bounded only by per-call timeouts, matching servers
    /// that give no progress guarantee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_polls: Option<u32>,
}

impl JobConfig {
    /// Create a config for the given submission URL with JSON default
    /// headers, no delay and no poll ceiling.
    pub fn new(url: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("accept".to_string(), "application/json".to_string());
        headers.insert("content-type".to_string(), "application/json".to_string());

        Self {
            url: url.into(),
            status_url_template: None,
            job_id_header: DEFAULT_JOB_ID_HEADER.to_string(),
            headers,
            request_delay: Duration::ZERO,
            max_polls: None,
        }
    }

    /// Set the status-URL template used to address polls.
    pub fn with_status_url_template(mut self, template: impl Into<String>) -> Self {
        self.status_url_template = Some(template.into());
        self
    }

    /// Override the header the job identifier is extracted from.
    pub fn with_job_id_header(mut self, header: impl Into<String>) -> Self {
        self.job_id_header = header.into();
        self
    }

    /// Insert or override a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the inter-request courtesy delay.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Set the poll ceiling.
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    /// Build the polling URL for a job identifier.
    ///
    /// Returns `None` when no template is configured.
    pub fn status_url(&self, request_id: &str) -> Option<String> {
        self.status_url_template.as_deref().map(|template| {
            if template.contains("{request_id}") {
                template.replace("{request_id}", request_id)
            } else {
                format!("{template}{request_id}")
            }
        })
    }
}

/// Batch configuration for the load harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Total number of job lifecycles to execute.
    pub num_requests: usize,

    /// Maximum number of job lifecycles in flight at any instant.
    pub concurrency: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            num_requests: 1,
            concurrency: 1,
        }
    }
}

impl HarnessConfig {
    /// Create a config for the given request count and concurrency ceiling.
    pub fn new(num_requests: usize, concurrency: usize) -> Self {
        Self {
            num_requests,
            concurrency,
        }
    }

    /// Number of worker tasks to spawn. Never more than there are requests,
    /// so a ceiling larger than the batch simply runs the whole batch at
    /// once.
    pub fn worker_count(&self) -> usize {
        self.concurrency.min(self.num_requests)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.num_requests == 0 {
            return Err(HarnessError::config("num_requests must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(HarnessError::config("concurrency must be at least 1"));
        }
        Ok(())
    }
}
