//! Worker tasks executing job lifecycles
//!
//! A Worker is the execution unit of the load harness: a tokio task that
//! repeatedly claims a job slot from the shared batch counter, samples a
//! payload, drives one full submit/poll lifecycle through the
//! [`JobClient`](crate::client::JobClient), and reports the outcome to the
//! aggregation channel. A worker runs one lifecycle to completion before
//! claiming the next slot, so a pool of C workers never has more than C
//! jobs in flight.

mod builder;
mod executor;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::Worker;
pub use stats::WorkerStats;
