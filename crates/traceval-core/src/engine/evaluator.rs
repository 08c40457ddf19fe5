//! Per-example evaluation with per-repetition failure containment

use serde_json::Value;
use tracing::warn;

use crate::error::{TracevalError, TracevalResult};
use crate::target::{ChatMessage, EvaluationTarget};
use crate::trace::RunTracer;
use crate::types::{Example, RepetitionOutcome};

/// Evaluate one example `repetitions` times against `target`.
///
/// The tracer's example tag is set for the duration of the call and restored
/// to its prior value afterwards, so a tracer handed in by an outer caller
/// keeps its own attribution. Repetitions run strictly in order; a failure in
/// one repetition is recorded as a marker and the loop continues. The returned
/// sequence always has exactly `repetitions` entries and this function never
/// fails: containment here is what lets one bad example never abort a batch.
pub async fn evaluate_example(
    example: &Example,
    tracer: &mut RunTracer,
    target: &EvaluationTarget,
    repetitions: usize,
) -> Vec<RepetitionOutcome> {
    let previous_example_id = tracer.example_id();
    tracer.set_example_id(Some(example.id));

    let mut outcomes = Vec::with_capacity(repetitions);
    for repetition in 0..repetitions {
        match invoke_target(example, tracer, target).await {
            Ok(output) => outcomes.push(RepetitionOutcome::output(output)),
            Err(error) => {
                warn!(
                    example_id = %example.id,
                    repetition,
                    %error,
                    "target invocation failed"
                );
                outcomes.push(RepetitionOutcome::failure(error.to_string()));
            }
        }
    }

    tracer.set_example_id(previous_example_id);
    outcomes
}

/// Dispatch one invocation on the shape the target arm requires.
///
/// Completion targets need a free-text `prompt` field, chat targets a
/// structured `messages` list; any other payload shape is an immediate
/// configuration failure for this repetition, never coerced. Factory targets
/// get a fresh pipeline instance per call.
async fn invoke_target(
    example: &Example,
    tracer: &mut RunTracer,
    target: &EvaluationTarget,
) -> TracevalResult<Value> {
    match target {
        EvaluationTarget::Completion(model) => {
            let prompt = example
                .inputs
                .get("prompt")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    TracevalError::invalid_input(format!(
                        "completion target requires a free-text 'prompt' input, got fields {:?}",
                        field_names(example)
                    ))
                })?;
            model.complete(prompt, tracer).await
        }
        EvaluationTarget::Chat(model) => {
            let raw = example.inputs.get("messages").cloned().ok_or_else(|| {
                TracevalError::invalid_input(format!(
                    "chat target requires a 'messages' input, got fields {:?}",
                    field_names(example)
                ))
            })?;
            let messages: Vec<ChatMessage> = serde_json::from_value(raw).map_err(|e| {
                TracevalError::invalid_input(format!("'messages' input is not a message list: {e}"))
            })?;
            model.chat(&messages, tracer).await
        }
        EvaluationTarget::Factory(factory) => {
            let mut pipeline = factory.build()?;
            pipeline.run(&example.inputs, tracer).await
        }
    }
}

fn field_names(example: &Example) -> Vec<&str> {
    example.inputs.keys().map(String::as_str).collect()
}
