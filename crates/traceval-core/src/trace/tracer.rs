//! Tracer resource implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::TracevalResult;
use crate::types::ExampleId;

/// One traced execution, as persisted to the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub name: String,
    /// Coarse kind of the traced call ("llm", "chain", ...)
    pub run_type: String,
    pub inputs: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    /// The example this run is attributable to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_example_id: Option<ExampleId>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl RunRecord {
    /// Start a new run record with the clock running
    pub fn new(name: impl Into<String>, run_type: impl Into<String>, inputs: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            run_type: run_type.into(),
            inputs,
            outputs: None,
            error: None,
            session_id: None,
            reference_example_id: None,
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// Close the record with a success payload
    pub fn finish(mut self, outputs: Value) -> Self {
        self.outputs = Some(outputs);
        self.end_time = Some(Utc::now());
        self
    }

    /// Close the record with an error message
    pub fn finish_with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.end_time = Some(Utc::now());
        self
    }
}

/// Stateful tracing handle bound to one in-flight evaluation at a time.
///
/// Carries the "current example" tag that the evaluator sets before invoking a
/// target and restores afterwards. Not shareable between concurrent
/// evaluations: the engine pools these instead (one per admitted worker).
#[derive(Debug)]
pub struct RunTracer {
    session_name: String,
    session_id: Option<Uuid>,
    example_id: Option<ExampleId>,
    client: Option<ApiClient>,
    buffered: Vec<RunRecord>,
}

impl RunTracer {
    /// Connect a tracer to the store, resolving or creating its session.
    ///
    /// This is the expensive setup step: the engine performs it once per
    /// pooled tracer at batch start, never per example.
    pub async fn connect(client: ApiClient, session_name: impl Into<String>) -> TracevalResult<Self> {
        let session_name = session_name.into();
        let session = client.ensure_session(&session_name).await?;
        Ok(Self {
            session_name,
            session_id: Some(session.id),
            example_id: None,
            client: Some(client),
            buffered: Vec::new(),
        })
    }

    /// Offline tracer buffering records in memory (local pipelines, tests)
    pub fn in_memory(session_name: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
            session_id: None,
            example_id: None,
            client: None,
            buffered: Vec::new(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// The example currently tagged on this tracer
    pub fn example_id(&self) -> Option<ExampleId> {
        self.example_id
    }

    /// Re-tag the tracer. Callers must restore the previous tag when done so
    /// an enclosing evaluation keeps its attribution.
    pub fn set_example_id(&mut self, example_id: Option<ExampleId>) {
        self.example_id = example_id;
    }

    /// Persist a run, stamping it with the session and the tagged example
    pub async fn record_run(&mut self, mut record: RunRecord) -> TracevalResult<()> {
        record.session_id = self.session_id;
        record.reference_example_id = self.example_id;
        match &self.client {
            Some(client) => client.create_run(&record).await?,
            None => self.buffered.push(record),
        }
        Ok(())
    }

    /// Records buffered by an offline tracer
    pub fn recorded_runs(&self) -> &[RunRecord] {
        &self.buffered
    }
}
