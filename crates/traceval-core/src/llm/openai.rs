//! OpenAI-compatible model client
//!
//! Implements both direct-model invocation shapes against any endpoint that
//! speaks the OpenAI wire format, recording every call on the supplied tracer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{TracevalError, TracevalResult};
use crate::target::{ChatMessage, ChatModel, CompletionModel};
use crate::trace::{RunRecord, RunTracer};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for an OpenAI-compatible completion/chat endpoint
pub struct OpenAiModel {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiModel {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> TracevalResult<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        })
    }

    async fn post(&self, path: &str, body: Value) -> TracevalResult<Value> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut request = self.http.post(url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TracevalError::llm(format!("{status}: {text}")));
        }
        Ok(response.json().await?)
    }
}

/// Trace loss should not fail an otherwise good model call
async fn record_or_warn(tracer: &mut RunTracer, record: RunRecord) {
    if let Err(error) = tracer.record_run(record).await {
        warn!(%error, "failed to persist run record");
    }
}

#[async_trait]
impl CompletionModel for OpenAiModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, tracer: &mut RunTracer) -> TracevalResult<Value> {
        let record = RunRecord::new(&self.model, "llm", json!({ "prompt": prompt }));
        let body = json!({ "model": self.model, "prompt": prompt });
        match self.post("/completions", body).await {
            Ok(output) => {
                record_or_warn(tracer, record.finish(output.clone())).await;
                Ok(output)
            }
            Err(error) => {
                record_or_warn(tracer, record.finish_with_error(error.to_string())).await;
                Err(error)
            }
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatMessage], tracer: &mut RunTracer) -> TracevalResult<Value> {
        let record = RunRecord::new(&self.model, "llm", json!({ "messages": messages }));
        let body = json!({ "model": self.model, "messages": messages });
        match self.post("/chat/completions", body).await {
            Ok(output) => {
                record_or_warn(tracer, record.finish(output.clone())).await;
                Ok(output)
            }
            Err(error) => {
                record_or_warn(tracer, record.finish_with_error(error.to_string())).await;
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn chat_returns_the_raw_response_and_records_the_run() {
        let server = MockServer::start().await;
        let reply = json!({
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply.clone()))
            .mount(&server)
            .await;

        let model = OpenAiModel::new(server.uri(), None, "test-model").unwrap();
        let mut tracer = RunTracer::in_memory("s");
        let messages = [ChatMessage::user("hi")];

        let output = model.chat(&messages, &mut tracer).await.unwrap();
        assert_eq!(output, reply);

        let runs = tracer.recorded_runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_type, "llm");
        assert_eq!(runs[0].outputs.as_ref(), Some(&reply));
    }

    #[tokio::test]
    async fn completion_failure_is_recorded_and_propagated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let model = OpenAiModel::new(server.uri(), Some("sk-test".into()), "test-model").unwrap();
        let mut tracer = RunTracer::in_memory("s");

        let error = model.complete("hi", &mut tracer).await.unwrap_err();
        assert!(matches!(error, TracevalError::Llm(_)));

        let runs = tracer.recorded_runs();
        assert_eq!(runs.len(), 1);
        assert!(runs[0].error.as_deref().unwrap().contains("rate limited"));
        assert!(runs[0].outputs.is_none());
    }
}
