//! Batch orchestration: concurrent fan-out and the sequential variant

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info};

use super::evaluator::evaluate_example;
use super::gate::AdmissionGate;
use super::job::JobState;
use super::pool::TracerPool;
use crate::error::{TracevalError, TracevalResult};
use crate::target::EvaluationTarget;
use crate::trace::RunTracer;
use crate::types::{BatchResults, Example};

/// Knobs for one batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Times each example is evaluated
    pub repetitions: usize,
    /// Simultaneous evaluations (and pooled tracers) in concurrent mode
    pub concurrency: usize,
    /// Session label; derived from dataset and target when absent
    pub session_name: Option<String>,
    /// Log per-example progress
    pub verbose: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            repetitions: 1,
            concurrency: 5,
            session_name: None,
            verbose: false,
        }
    }
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn validate_repetitions(&self) -> TracevalResult<()> {
        if self.repetitions == 0 {
            return Err(TracevalError::config("repetitions must be at least 1"));
        }
        Ok(())
    }
}

/// Evaluate every example with at most `options.concurrency` simultaneous
/// workers sharing a pool of pre-built tracers.
///
/// `build_tracer` runs once per pooled tracer before any work is scheduled; if
/// any build fails the whole batch fails fast, since a partial pool would
/// break the gate/pool lockstep. Per-example work itself never fails (the
/// evaluator contains failures), so the returned map always has one entry per
/// example regardless of completion order.
pub async fn run_batch<F, Fut>(
    examples: Vec<Example>,
    target: &EvaluationTarget,
    options: &BatchOptions,
    build_tracer: F,
) -> TracevalResult<BatchResults>
where
    F: Fn() -> Fut,
    Fut: Future<Output = TracevalResult<RunTracer>>,
{
    options.validate_repetitions()?;
    let gate = AdmissionGate::new(options.concurrency)?;

    let mut tracers = Vec::with_capacity(options.concurrency);
    for _ in 0..options.concurrency {
        tracers.push(build_tracer().await?);
    }
    let pool = TracerPool::new(tracers);

    let total = examples.len();
    debug!(
        total_examples = total,
        concurrency = options.concurrency,
        repetitions = options.repetitions,
        target = target.name(),
        "starting concurrent batch"
    );

    let results: Arc<Mutex<BatchResults>> = Arc::new(Mutex::new(HashMap::with_capacity(total)));
    let job_state = Arc::new(JobState::new());

    let mut tasks = JoinSet::new();
    for example in examples {
        let gate = gate.clone();
        let pool = Arc::clone(&pool);
        let results = Arc::clone(&results);
        let job_state = Arc::clone(&job_state);
        let target = target.clone();
        let repetitions = options.repetitions;
        let verbose = options.verbose;

        tasks.spawn(async move {
            let permit = gate.admit().await?;
            let mut tracer = pool.checkout().await?;
            let outcomes = evaluate_example(&example, &mut tracer, &target, repetitions).await;
            // Return the tracer before opening the gate for the next waiter
            drop(tracer);
            drop(permit);

            results.lock().insert(example.id, outcomes);
            let completed = job_state.record_completion();
            if verbose {
                info!(completed, total, example_id = %example.id, "example processed");
            }
            Ok::<(), TracevalError>(())
        });
    }

    while let Some(joined) = tasks.join_next().await {
        joined.map_err(|e| TracevalError::other(format!("evaluation task failed: {e}")))??;
    }

    let results = match Arc::try_unwrap(results) {
        Ok(mutex) => mutex.into_inner(),
        Err(shared) => shared.lock().clone(),
    };
    Ok(results)
}

/// Strictly sequential variant: one tracer, examples evaluated in turn.
///
/// For targets and call sites that cannot tolerate concurrent invocation.
/// Aggregation matches the concurrent mode: every example's outcome sequence
/// is accumulated, keyed by example id.
pub async fn run_batch_sequential<F, Fut>(
    examples: Vec<Example>,
    target: &EvaluationTarget,
    options: &BatchOptions,
    build_tracer: F,
) -> TracevalResult<BatchResults>
where
    F: Fn() -> Fut,
    Fut: Future<Output = TracevalResult<RunTracer>>,
{
    options.validate_repetitions()?;
    let mut tracer = build_tracer().await?;

    let total = examples.len();
    debug!(
        total_examples = total,
        repetitions = options.repetitions,
        target = target.name(),
        "starting sequential batch"
    );

    let mut results = HashMap::with_capacity(total);
    for (index, example) in examples.into_iter().enumerate() {
        let outcomes = evaluate_example(&example, &mut tracer, target, options.repetitions).await;
        results.insert(example.id, outcomes);
        if options.verbose {
            info!(completed = index + 1, total, example_id = %example.id, "example processed");
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::CompletionModel;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StaticModel;

    #[async_trait]
    impl CompletionModel for StaticModel {
        fn model_name(&self) -> &str {
            "static"
        }

        async fn complete(&self, _prompt: &str, _tracer: &mut RunTracer) -> TracevalResult<Value> {
            Ok(json!("ok"))
        }
    }

    struct FailingModel;

    #[async_trait]
    impl CompletionModel for FailingModel {
        fn model_name(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _prompt: &str, _tracer: &mut RunTracer) -> TracevalResult<Value> {
            Err(TracevalError::llm("boom"))
        }
    }

    /// Sleeps per call and tracks how many invocations overlap
    struct SleepyModel {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        invocations: AtomicUsize,
    }

    impl SleepyModel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                invocations: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionModel for SleepyModel {
        fn model_name(&self) -> &str {
            "sleepy"
        }

        async fn complete(&self, _prompt: &str, _tracer: &mut RunTracer) -> TracevalResult<Value> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(json!("ok"))
        }
    }

    fn prompt_examples(n: usize) -> Vec<Example> {
        (0..n)
            .map(|i| {
                let mut inputs = crate::types::ExampleInputs::new();
                inputs.insert("prompt".into(), json!(format!("q{i}")));
                Example::new(inputs)
            })
            .collect()
    }

    fn in_memory_builder() -> impl Fn() -> std::future::Ready<TracevalResult<RunTracer>> {
        || std::future::ready(Ok(RunTracer::in_memory("test-session")))
    }

    #[tokio::test]
    async fn concurrent_results_cover_every_example() {
        let examples = prompt_examples(3);
        let expected: HashSet<_> = examples.iter().map(|e| e.id).collect();
        let target = EvaluationTarget::completion(Arc::new(StaticModel));
        let options = BatchOptions::new().with_repetitions(2);

        let results = run_batch(examples, &target, &options, in_memory_builder())
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results.keys().copied().collect::<HashSet<_>>(), expected);
        for outcomes in results.values() {
            assert_eq!(outcomes.len(), 2);
            assert!(outcomes
                .iter()
                .all(|o| *o == crate::types::RepetitionOutcome::output(json!("ok"))));
        }
    }

    #[tokio::test]
    async fn failing_target_still_yields_a_complete_map() {
        let examples = prompt_examples(3);
        let target = EvaluationTarget::completion(Arc::new(FailingModel));
        let options = BatchOptions::new().with_repetitions(2);

        let results = run_batch(examples, &target, &options, in_memory_builder())
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        for outcomes in results.values() {
            assert_eq!(outcomes.len(), 2);
            for outcome in outcomes {
                let message = outcome.error_message().expect("failure marker");
                assert!(message.contains("boom"));
            }
        }
    }

    #[tokio::test]
    async fn observed_peak_concurrency_matches_the_bound() {
        let model = SleepyModel::new();
        let target = EvaluationTarget::completion(model.clone());
        let options = BatchOptions::new().with_concurrency(2);

        let results = run_batch(prompt_examples(10), &target, &options, in_memory_builder())
            .await
            .unwrap();

        assert_eq!(results.len(), 10);
        assert_eq!(model.invocations.load(Ordering::SeqCst), 10);
        let peak = model.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak concurrency {peak} exceeded the bound");
        assert_eq!(peak, 2, "ten sleeping examples should saturate the bound");
    }

    #[tokio::test]
    async fn zero_concurrency_fails_before_building_any_tracer() {
        let target = EvaluationTarget::completion(Arc::new(StaticModel));
        let options = BatchOptions::new().with_concurrency(0);
        let builds = AtomicUsize::new(0);

        let result = run_batch(prompt_examples(2), &target, &options, || {
            builds.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(RunTracer::in_memory("never")))
        })
        .await;

        assert!(matches!(result, Err(TracevalError::Config(_))));
        assert_eq!(builds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_tracer_construction_aborts_before_any_evaluation() {
        let model = SleepyModel::new();
        let target = EvaluationTarget::completion(model.clone());
        let options = BatchOptions::new().with_concurrency(3);
        let builds = AtomicUsize::new(0);

        let result = run_batch(prompt_examples(5), &target, &options, || {
            let attempt = builds.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if attempt == 1 {
                Err(TracevalError::http("session setup refused"))
            } else {
                Ok(RunTracer::in_memory("partial"))
            })
        })
        .await;

        assert!(matches!(result, Err(TracevalError::Http(_))));
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert_eq!(model.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_repetitions_is_rejected_in_both_modes() {
        let target = EvaluationTarget::completion(Arc::new(StaticModel));
        let options = BatchOptions::new().with_repetitions(0);

        let concurrent =
            run_batch(prompt_examples(1), &target, &options, in_memory_builder()).await;
        assert!(matches!(concurrent, Err(TracevalError::Config(_))));

        let sequential =
            run_batch_sequential(prompt_examples(1), &target, &options, in_memory_builder()).await;
        assert!(matches!(sequential, Err(TracevalError::Config(_))));
    }

    #[tokio::test]
    async fn sequential_mode_accumulates_every_example() {
        let examples = prompt_examples(4);
        let expected: HashSet<_> = examples.iter().map(|e| e.id).collect();
        let target = EvaluationTarget::completion(Arc::new(StaticModel));
        let options = BatchOptions::new().with_repetitions(2);

        let results = run_batch_sequential(examples, &target, &options, in_memory_builder())
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results.keys().copied().collect::<HashSet<_>>(), expected);
        for outcomes in results.values() {
            assert_eq!(outcomes.len(), 2);
        }
    }

    #[tokio::test]
    async fn empty_batch_returns_an_empty_map() {
        let target = EvaluationTarget::completion(Arc::new(StaticModel));
        let options = BatchOptions::default();

        let results = run_batch(Vec::new(), &target, &options, in_memory_builder())
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
