//! Evaluation targets: direct language models and pipeline factories
//!
//! The engine never inspects what a target computes. It only needs a closed
//! set of invocation shapes: text completion, chat, or a freshly constructed
//! pipeline per repetition.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TracevalResult;
use crate::trace::RunTracer;
use crate::types::ExampleInputs;

/// One message of a chat-style input payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// A model invoked with a single free-text prompt
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Model name, used for session labels and logs
    fn model_name(&self) -> &str;

    /// Generate a completion for `prompt`, recording the call on `tracer`
    async fn complete(&self, prompt: &str, tracer: &mut RunTracer) -> TracevalResult<Value>;
}

/// A model invoked with a structured message list
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model name, used for session labels and logs
    fn model_name(&self) -> &str;

    /// Generate a chat response for `messages`, recording the call on `tracer`
    async fn chat(&self, messages: &[ChatMessage], tracer: &mut RunTracer)
        -> TracevalResult<Value>;
}

/// One independently-stateful pipeline instance.
///
/// Instances are single-use from the engine's point of view: a fresh one is
/// built for every repetition of every example, so state cannot leak between
/// invocations.
#[async_trait]
pub trait Pipeline: Send {
    /// Run the pipeline against one example's input payload
    async fn run(&mut self, inputs: &ExampleInputs, tracer: &mut RunTracer)
        -> TracevalResult<Value>;
}

/// Factory producing fresh pipeline instances
pub trait PipelineFactory: Send + Sync {
    /// Pipeline name, used for session labels and logs
    fn pipeline_name(&self) -> &str;

    /// Construct a new, independent pipeline instance
    fn build(&self) -> TracevalResult<Box<dyn Pipeline>>;
}

/// The model or pipeline-constructing callable under test.
///
/// A closed variant rather than a trait object so the evaluator can dispatch
/// on the invocation shape each arm requires from the example's inputs.
#[derive(Clone)]
pub enum EvaluationTarget {
    /// Direct model fed the example's `prompt` field
    Completion(Arc<dyn CompletionModel>),
    /// Direct model fed the example's `messages` field
    Chat(Arc<dyn ChatModel>),
    /// Zero-argument factory; a new instance runs every repetition
    Factory(Arc<dyn PipelineFactory>),
}

impl EvaluationTarget {
    pub fn completion(model: Arc<dyn CompletionModel>) -> Self {
        Self::Completion(model)
    }

    pub fn chat(model: Arc<dyn ChatModel>) -> Self {
        Self::Chat(model)
    }

    pub fn factory(factory: Arc<dyn PipelineFactory>) -> Self {
        Self::Factory(factory)
    }

    /// Display name of the underlying model or pipeline
    pub fn name(&self) -> &str {
        match self {
            Self::Completion(model) => model.model_name(),
            Self::Chat(model) => model.model_name(),
            Self::Factory(factory) => factory.pipeline_name(),
        }
    }
}

impl std::fmt::Debug for EvaluationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Completion(_) => "Completion",
            Self::Chat(_) => "Chat",
            Self::Factory(_) => "Factory",
        };
        write!(f, "EvaluationTarget::{}({})", kind, self.name())
    }
}
