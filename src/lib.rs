//! routeload: load generation for asynchronous, poll-based job APIs
//!
//! This crate exercises route-optimization services that accept a job via
//! `POST` and either answer synchronously or queue the job behind a 202,
//! leaving the client to poll a status endpoint until it resolves. It
//! provides:
//!
//! - A retrying HTTP transport with exponential backoff for transient
//!   failures ([`transport`])
//! - The submit/poll protocol state machine for one job ([`client`])
//! - A bounded-concurrency load harness fanning out many job lifecycles
//!   and aggregating their outcomes ([`harness`], [`worker`])
//! - Payload sampling and routing-instance file loading ([`sampling`],
//!   [`dataset`])

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod client;
pub mod config;
pub mod dataset;
pub mod error;
pub mod harness;
pub mod sampling;
pub mod transport;
pub mod worker;

pub use client::{JobClient, JobMetrics, JobSuccess};
pub use config::{HarnessConfig, JobConfig};
pub use error::{HarnessError, HarnessResult, JobError, TransportError};
pub use harness::{drive, CancelFlag, Harness, HarnessBuilder, JobOutcome, LoadRun};
pub use sampling::{PayloadSampler, UniformSampler};
pub use transport::{
    HttpTransport, ReqwestTransport, RetryPolicy, RetryingTransport, TransportRequest,
    TransportResponse,
};
pub use worker::{Worker, WorkerBuilder, WorkerStats};
