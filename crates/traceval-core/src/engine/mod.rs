//! Concurrent evaluation engine
//!
//! Fans a batch of examples out through an admission gate and a pool of
//! tracer resources, contains per-repetition failures, and aggregates one
//! keyed result map per batch. See [`run_batch`] and [`run_batch_sequential`].

mod evaluator;
mod gate;
mod job;
mod pool;
mod runner;

pub use evaluator::evaluate_example;
pub use gate::{AdmissionGate, AdmissionPermit};
pub use job::JobState;
pub use pool::{PooledTracer, TracerPool};
pub use runner::{run_batch, run_batch_sequential, BatchOptions};
