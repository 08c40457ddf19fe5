//! Session label derivation

use chrono::Local;

use crate::target::EvaluationTarget;

/// Resolve the session label a batch records under.
///
/// An explicit label wins; otherwise one is synthesized from the dataset
/// name, the target's name and a timestamp, so repeated runs against the same
/// dataset stay distinguishable without caller bookkeeping.
pub fn session_label(
    explicit: Option<&str>,
    dataset_name: &str,
    target: &EvaluationTarget,
) -> String {
    if let Some(label) = explicit {
        return label.to_string();
    }
    let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
    format!("{}-{}-{}", dataset_name, target.name(), timestamp)
}
