//! HTTP transport abstraction
//!
//! The transport layer performs individual HTTP calls, independent of the
//! submit/poll protocol above it. [`HttpTransport`] is the seam the job
//! client drives; [`ReqwestTransport`] is the production implementation and
//! [`RetryingTransport`] wraps any transport with exponential-backoff retry
//! for transient failures.

mod http;
mod retry;

pub use http::ReqwestTransport;
pub use retry::{RetryPolicy, RetryingTransport};

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::error::TransportError;

/// One HTTP call to perform.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method (POST for submissions, GET for polls).
    pub method: Method,

    /// Absolute request URL.
    pub url: String,

    /// Request headers.
    pub headers: HashMap<String, String>,

    /// JSON body, present on submissions.
    pub body: Option<Value>,
}

impl TransportRequest {
    /// Build a POST request with a JSON body.
    pub fn post(url: impl Into<String>, headers: HashMap<String, String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers,
            body: Some(body),
        }
    }

    /// Build a GET request.
    pub fn get(url: impl Into<String>, headers: HashMap<String, String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers,
            body: None,
        }
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// Response status code.
    pub status: StatusCode,

    /// Response headers, lower-cased names.
    pub headers: HashMap<String, String>,

    /// Raw response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Look up a response header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Response body size in bytes.
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as lossy UTF-8 text, for error reporting.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Seam between the job client and the network.
///
/// Implementations must be shareable across workers; the production
/// implementation shares one connection pool for every call in a batch.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one HTTP call.
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_header_lookup_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("nvcf-reqid".to_string(), "abc123".to_string());
        let response = TransportResponse {
            status: StatusCode::ACCEPTED,
            headers,
            body: Vec::new(),
        };

        assert_eq!(response.header("NVCF-REQID"), Some("abc123"));
        assert_eq!(response.header("nvcf-reqid"), Some("abc123"));
        assert_eq!(response.header("missing"), None);
    }

    #[test]
    fn test_response_json_parse() {
        let response = TransportResponse {
            status: StatusCode::OK,
            headers: HashMap::new(),
            body: br#"{"status":"done"}"#.to_vec(),
        };

        let value = response.json().unwrap();
        assert_eq!(value["status"], "done");
        assert_eq!(response.size(), 17);
    }

    #[test]
    fn test_request_constructors() {
        let request = TransportRequest::post(
            "http://localhost/optimize",
            HashMap::new(),
            serde_json::json!({"n": 1}),
        );
        assert_eq!(request.method, Method::POST);
        assert!(request.body.is_some());

        let request = TransportRequest::get("http://localhost/status/abc", HashMap::new());
        assert_eq!(request.method, Method::GET);
        assert!(request.body.is_none());
    }
}
