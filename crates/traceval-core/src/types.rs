//! Domain records shared between the store client and the evaluation engine

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Named input fields of an example, as stored in the dataset
pub type ExampleInputs = serde_json::Map<String, Value>;

/// Unique identifier for a dataset example
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExampleId(pub Uuid);

impl ExampleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExampleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for ExampleId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// One (input, optional expected-output) record of a dataset.
///
/// Immutable for the duration of a batch; the engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example {
    pub id: ExampleId,
    pub dataset_id: Uuid,
    pub inputs: ExampleInputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<ExampleInputs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Example {
    /// Create a detached example (mostly useful for local pipelines and tests)
    pub fn new(inputs: ExampleInputs) -> Self {
        Self {
            id: ExampleId::new(),
            dataset_id: Uuid::new_v4(),
            inputs,
            outputs: None,
            created_at: Some(Utc::now()),
        }
    }
}

/// A named collection of examples in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A tracing session under which run records are grouped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracerSession {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

/// Failure marker recorded in place of a success payload.
///
/// Serializes as `{"Error": "<message>"}` so stored results stay readable
/// next to raw model outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureMarker {
    #[serde(rename = "Error")]
    pub error: String,
}

/// Outcome of one repetition of one example: either the target's raw output
/// or a failure marker carrying the error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepetitionOutcome {
    Failure(FailureMarker),
    Output(Value),
}

impl RepetitionOutcome {
    pub fn output(value: Value) -> Self {
        Self::Output(value)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(FailureMarker {
            error: message.into(),
        })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The recorded error message, if this outcome is a failure
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failure(marker) => Some(marker.error.as_str()),
            Self::Output(_) => None,
        }
    }
}

/// Aggregate result of a batch: one entry per scheduled example, each holding
/// exactly `repetitions` outcomes.
pub type BatchResults = HashMap<ExampleId, Vec<RepetitionOutcome>>;
