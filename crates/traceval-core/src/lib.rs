//! traceval core library
//!
//! Evaluates a language model or pipeline target against every example of a
//! dataset, with bounded concurrency and per-run tracing. The engine module
//! holds the scheduler; the client module talks to the dataset/trace store.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod session;
pub mod target;
pub mod trace;
pub mod types;

// Re-export commonly used types
pub use client::ApiClient;
pub use config::ApiConfig;
pub use engine::{run_batch, run_batch_sequential, AdmissionGate, BatchOptions, TracerPool};
pub use error::{TracevalError, TracevalResult};
pub use llm::OpenAiModel;
pub use session::session_label;
pub use target::{
    ChatMessage, ChatModel, CompletionModel, EvaluationTarget, Pipeline, PipelineFactory,
};
pub use trace::{RunRecord, RunTracer};
pub use types::{BatchResults, Dataset, Example, ExampleId, RepetitionOutcome, TracerSession};
