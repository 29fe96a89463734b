//! Job client: the submit/poll protocol state machine
//!
//! One [`JobClient`] drives a single job from submission to a terminal
//! outcome: `SUBMITTING -> (ACCEPTED_SYNC | POLLING) -> SUCCEEDED | FAILED`.
//! A server may answer a submission synchronously with a final 2xx body, or
//! queue the job with a 202 carrying a request identifier in a response
//! header; in the latter case the client polls a status URL derived from
//! that identifier until the job resolves.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::JobConfig;
use crate::error::JobError;
use crate::harness::CancelFlag;
use crate::transport::{HttpTransport, TransportRequest, TransportResponse};

/// Metrics recorded for a resolved job.
#[derive(Debug, Clone)]
pub struct JobMetrics {
    /// Wall time from submission to resolution, delays included.
    pub duration: Duration,

    /// Number of status polls issued. Zero when the server answered
    /// synchronously.
    pub poll_count: u32,

    /// Status code of the final response.
    pub status_code: u16,

    /// Size of the final response body in bytes.
    pub response_size: usize,
}

/// Terminal success of one job lifecycle.
#[derive(Debug, Clone)]
pub struct JobSuccess {
    /// Parsed JSON body of the final response.
    pub body: Value,

    /// Per-job metrics.
    pub metrics: JobMetrics,

    /// When the job resolved.
    pub completed_at: DateTime<Utc>,
}

/// Executes the submit -> (optional poll loop) -> result protocol for one
/// job at a time.
///
/// The client is stateless between jobs: configuration is read-only and the
/// transport is shared, so one instance serves every worker in a batch.
pub struct JobClient {
    transport: Arc<dyn HttpTransport>,
    config: JobConfig,
}

impl JobClient {
    /// Create a client over the given transport and configuration.
    pub fn new(transport: Arc<dyn HttpTransport>, config: JobConfig) -> Self {
        Self { transport, config }
    }

    /// The shared job configuration.
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Drive one job from submission to a terminal outcome.
    ///
    /// The payload is treated as an opaque JSON document. `cancel` is
    /// observed between network calls only, so an in-flight call always
    /// finishes before cancellation takes effect.
    pub async fn run(&self, payload: &Value, cancel: &CancelFlag) -> Result<JobSuccess, JobError> {
        let start = Instant::now();

        self.pause().await;
        let submission = TransportRequest::post(
            self.config.url.clone(),
            self.config.headers.clone(),
            payload.clone(),
        );
        let response = self.transport.send(&submission).await?;
        let status = response.status;

        if status == StatusCode::ACCEPTED {
            return self.poll(&response, start, cancel).await;
        }
        if status.is_success() {
            // ACCEPTED_SYNC: the submission response is already final.
            return self.finish(response, 0, start);
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(JobError::Http {
                status: status.as_u16(),
                body: response.text(),
            });
        }
        Err(JobError::Protocol(format!(
            "unexpected status {status} on submission"
        )))
    }

    /// POLLING: repeatedly fetch the status URL until the job resolves.
    async fn poll(
        &self,
        accepted: &TransportResponse,
        start: Instant,
        cancel: &CancelFlag,
    ) -> Result<JobSuccess, JobError> {
        // The identifier only exists on the submission response; polls do
        // not carry it again.
        let request_id = accepted
            .header(&self.config.job_id_header)
            .ok_or_else(|| {
                JobError::Protocol(format!(
                    "202 response missing {} header",
                    self.config.job_id_header
                ))
            })?
            .to_string();

        let status_url = self.config.status_url(&request_id).ok_or_else(|| {
            JobError::Protocol("job accepted but no status URL template configured".to_string())
        })?;

        tracing::debug!(request_id = %request_id, status_url = %status_url, "job accepted, polling");

        let mut poll_count: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            if let Some(limit) = self.config.max_polls {
                if poll_count >= limit {
                    return Err(JobError::PollLimit { limit });
                }
            }

            poll_count += 1;
            self.pause().await;
            let request = TransportRequest::get(status_url.clone(), self.config.headers.clone());
            let response = self.transport.send(&request).await?;

            match response.status {
                StatusCode::ACCEPTED => continue,
                status if status.is_success() => {
                    return self.finish(response, poll_count, start);
                }
                status if status.is_client_error() || status.is_server_error() => {
                    return Err(JobError::Http {
                        status: status.as_u16(),
                        body: response.text(),
                    });
                }
                status => {
                    return Err(JobError::Protocol(format!(
                        "unexpected status {status} after polling"
                    )));
                }
            }
        }
    }

    /// SUCCEEDED: parse the final body and emit the metrics record.
    fn finish(
        &self,
        response: TransportResponse,
        poll_count: u32,
        start: Instant,
    ) -> Result<JobSuccess, JobError> {
        let body = response
            .json()
            .map_err(|e| JobError::Protocol(format!("invalid JSON in final response: {e}")))?;

        let metrics = JobMetrics {
            duration: start.elapsed(),
            poll_count,
            status_code: response.status.as_u16(),
            response_size: response.size(),
        };

        tracing::info!(
            duration_ms = metrics.duration.as_millis() as u64,
            poll_count = metrics.poll_count,
            status_code = metrics.status_code,
            response_size = metrics.response_size,
            "job completed"
        );

        Ok(JobSuccess {
            body,
            metrics,
            completed_at: Utc::now(),
        })
    }

    /// Courtesy delay before every network call.
    async fn pause(&self) {
        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    use async_trait::async_trait;
    use reqwest::Method;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Transport replaying a scripted response sequence while recording
    /// every call it receives.
    struct RecordingTransport {
        script: Mutex<Vec<Result<TransportResponse, TransportError>>>,
        log: Mutex<Vec<(Method, String)>>,
    }

    impl RecordingTransport {
        fn new(script: Vec<Result<TransportResponse, TransportError>>) -> Arc<Self> {
            let mut script = script;
            script.reverse();
            Arc::new(Self {
                script: Mutex::new(script),
                log: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(Method, String)> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn send(
            &self,
            request: &TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            self.log
                .lock()
                .unwrap()
                .push((request.method.clone(), request.url.clone()));
            self.script
                .lock()
                .unwrap()
                .pop()
                .expect("scripted transport exhausted")
        }
    }

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> TransportResponse {
        TransportResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn config() -> JobConfig {
        JobConfig::new("http://localhost/optimize")
            .with_status_url_template("http://localhost/status/")
    }

    fn payload() -> Value {
        serde_json::json!({"cost_matrix": [[0, 1], [1, 0]]})
    }

    #[tokio::test]
    async fn test_synchronous_success_polls_zero_times() {
        let transport = RecordingTransport::new(vec![Ok(response(200, &[], r#"{"ok":true}"#))]);
        let client = JobClient::new(transport.clone(), config());

        let success = client.run(&payload(), &CancelFlag::new()).await.unwrap();
        assert_eq!(success.metrics.poll_count, 0);
        assert_eq!(success.metrics.status_code, 200);
        assert_eq!(success.body["ok"], true);

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Method::POST);
    }

    #[tokio::test]
    async fn test_accepted_then_polled_to_completion() {
        let transport = RecordingTransport::new(vec![
            Ok(response(202, &[("NVCF-REQID", "abc123")], "")),
            Ok(response(202, &[], "")),
            Ok(response(200, &[], r#"{"status":"done"}"#)),
        ]);
        let client = JobClient::new(transport.clone(), config());

        let success = client.run(&payload(), &CancelFlag::new()).await.unwrap();
        assert_eq!(success.metrics.poll_count, 2);
        assert_eq!(success.body["status"], "done");
        assert_eq!(success.metrics.response_size, r#"{"status":"done"}"#.len());

        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].0, Method::POST);
        assert_eq!(calls[1], (Method::GET, "http://localhost/status/abc123".to_string()));
        assert_eq!(calls[2], (Method::GET, "http://localhost/status/abc123".to_string()));
    }

    #[tokio::test]
    async fn test_final_body_is_poll_body_not_submission_body() {
        let transport = RecordingTransport::new(vec![
            Ok(response(202, &[("NVCF-REQID", "abc123")], r#"{"status":"queued"}"#)),
            Ok(response(200, &[], r#"{"status":"done"}"#)),
        ]);
        let client = JobClient::new(transport, config());

        let success = client.run(&payload(), &CancelFlag::new()).await.unwrap();
        assert_eq!(success.body["status"], "done");
        assert_eq!(success.metrics.poll_count, 1);
    }

    #[tokio::test]
    async fn test_missing_job_id_header_is_protocol_error_without_get() {
        let transport = RecordingTransport::new(vec![Ok(response(202, &[], ""))]);
        let client = JobClient::new(transport.clone(), config());

        let err = client.run(&payload(), &CancelFlag::new()).await.unwrap_err();
        assert!(matches!(err, JobError::Protocol(_)));
        assert!(err.to_string().contains("NVCF-REQID"));

        // The submission is the only call ever made.
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Method::POST);
    }

    #[tokio::test]
    async fn test_missing_status_template_is_protocol_error() {
        let transport =
            RecordingTransport::new(vec![Ok(response(202, &[("NVCF-REQID", "abc123")], ""))]);
        let client = JobClient::new(
            transport,
            JobConfig::new("http://localhost/optimize"), // no template
        );

        let err = client.run(&payload(), &CancelFlag::new()).await.unwrap_err();
        assert!(matches!(err, JobError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_custom_job_id_header() {
        let transport = RecordingTransport::new(vec![
            Ok(response(202, &[("x-request-id", "xyz")], "")),
            Ok(response(200, &[], "{}")),
        ]);
        let config = config().with_job_id_header("x-request-id");
        let client = JobClient::new(transport.clone(), config);

        client.run(&payload(), &CancelFlag::new()).await.unwrap();
        assert_eq!(
            transport.calls()[1].1,
            "http://localhost/status/xyz".to_string()
        );
    }

    #[tokio::test]
    async fn test_http_error_on_submission() {
        let transport = RecordingTransport::new(vec![Ok(response(400, &[], "bad request"))]);
        let client = JobClient::new(transport, config());

        let err = client.run(&payload(), &CancelFlag::new()).await.unwrap_err();
        match err {
            JobError::Http { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad request");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_error_during_polling() {
        let transport = RecordingTransport::new(vec![
            Ok(response(202, &[("NVCF-REQID", "abc123")], "")),
            Ok(response(403, &[], "forbidden")),
        ]);
        let client = JobClient::new(transport, config());

        let err = client.run(&payload(), &CancelFlag::new()).await.unwrap_err();
        assert!(matches!(err, JobError::Http { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_unexpected_status_after_polling_is_protocol_error() {
        let transport = RecordingTransport::new(vec![
            Ok(response(202, &[("NVCF-REQID", "abc123")], "")),
            Ok(response(301, &[], "")),
        ]);
        let client = JobClient::new(transport, config());

        let err = client.run(&payload(), &CancelFlag::new()).await.unwrap_err();
        match err {
            JobError::Protocol(message) => assert!(message.contains("after polling")),
            other => panic!("expected Protocol error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_poll_limit_enforced() {
        let transport = RecordingTransport::new(vec![
            Ok(response(202, &[("NVCF-REQID", "abc123")], "")),
            Ok(response(202, &[], "")),
            Ok(response(202, &[], "")),
        ]);
        let client = JobClient::new(transport.clone(), config().with_max_polls(2));

        let err = client.run(&payload(), &CancelFlag::new()).await.unwrap_err();
        assert!(matches!(err, JobError::PollLimit { limit: 2 }));

        // one submission plus exactly two polls
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_cancel_stops_before_next_poll() {
        let cancel = CancelFlag::new();
        cancel.cancel();

        let transport =
            RecordingTransport::new(vec![Ok(response(202, &[("NVCF-REQID", "abc123")], ""))]);
        let client = JobClient::new(transport.clone(), config());

        let err = client.run(&payload(), &cancel).await.unwrap_err();
        assert!(matches!(err, JobError::Cancelled));
        // submission finished, no poll was issued
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_body_is_protocol_error() {
        let transport = RecordingTransport::new(vec![Ok(response(200, &[], "not json"))]);
        let client = JobClient::new(transport, config());

        let err = client.run(&payload(), &CancelFlag::new()).await.unwrap_err();
        assert!(matches!(err, JobError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_transport_error_surfaces_as_job_failure() {
        let transport = RecordingTransport::new(vec![Err(TransportError::Connection {
            message: "connection refused".into(),
        })]);
        let client = JobClient::new(transport, config());

        let err = client.run(&payload(), &CancelFlag::new()).await.unwrap_err();
        assert!(matches!(err, JobError::Transport(_)));
    }

    #[tokio::test]
    async fn test_independent_lifecycles_for_identical_payloads() {
        let transport = RecordingTransport::new(vec![
            Ok(response(202, &[("NVCF-REQID", "first")], "")),
            Ok(response(200, &[], r#"{"run":1}"#)),
            Ok(response(202, &[("NVCF-REQID", "second")], "")),
            Ok(response(200, &[], r#"{"run":2}"#)),
        ]);
        let client = JobClient::new(transport.clone(), config());
        let cancel = CancelFlag::new();

        let first = client.run(&payload(), &cancel).await.unwrap();
        let second = client.run(&payload(), &cancel).await.unwrap();

        assert_eq!(first.body["run"], 1);
        assert_eq!(second.body["run"], 2);

        let calls = transport.calls();
        assert_eq!(calls[1].1, "http://localhost/status/first");
        assert_eq!(calls[3].1, "http://localhost/status/second");
    }
}
