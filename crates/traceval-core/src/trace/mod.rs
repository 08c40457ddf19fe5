//! Run tracing: pooled tracer handles and the records they persist

mod tracer;

pub use tracer::{RunRecord, RunTracer};
