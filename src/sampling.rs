//! Payload selection for load generation
//!
//! Each job slot draws one payload from a candidate set. The draw is behind
//! a trait so load shapes other than uniform (weighted, round-robin) can be
//! swapped in without touching the harness.

use rand::seq::SliceRandom;
use serde_json::Value;

use crate::error::HarnessError;

/// Selects the payload for the next job slot.
pub trait PayloadSampler: Send + Sync {
    /// Draw one payload. Draws are independent; repeats are allowed.
    fn sample(&self) -> Value;

    /// Number of candidate payloads.
    fn len(&self) -> usize;

    /// Whether the candidate set is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Uniform random selection over a fixed candidate set.
#[derive(Debug)]
pub struct UniformSampler {
    payloads: Vec<Value>,
}

impl UniformSampler {
    /// Create a sampler over the given payloads.
    ///
    /// An empty set is a configuration error: the harness would have
    /// nothing to submit.
    pub fn new(payloads: Vec<Value>) -> Result<Self, HarnessError> {
        if payloads.is_empty() {
            return Err(HarnessError::config("payload set must not be empty"));
        }
        Ok(Self { payloads })
    }

    /// Convenience constructor for a single payload.
    pub fn single(payload: Value) -> Self {
        Self {
            payloads: vec![payload],
        }
    }
}

impl PayloadSampler for UniformSampler {
    fn sample(&self) -> Value {
        let mut rng = rand::thread_rng();
        self.payloads
            .choose(&mut rng)
            .expect("payload set is non-empty by construction")
            .clone()
    }

    fn len(&self) -> usize {
        self.payloads.len()
    }
}
