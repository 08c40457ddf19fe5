//! Dataset-level evaluation entry points

use tracing::info;

use super::ApiClient;
use crate::engine::{run_batch, run_batch_sequential, BatchOptions};
use crate::error::TracevalResult;
use crate::session::session_label;
use crate::target::EvaluationTarget;
use crate::trace::RunTracer;
use crate::types::BatchResults;

impl ApiClient {
    /// Evaluate `target` against every example of the named dataset with
    /// bounded concurrency, tracing each run under the resolved session.
    ///
    /// Returns one outcome sequence per example; configuration and tracer
    /// setup problems fail the call before any example is processed.
    pub async fn run_on_dataset_concurrent(
        &self,
        dataset_name: &str,
        target: &EvaluationTarget,
        options: &BatchOptions,
    ) -> TracevalResult<BatchResults> {
        let session = session_label(options.session_name.as_deref(), dataset_name, target);
        let dataset = self.read_dataset(dataset_name).await?;
        let examples = self.list_examples(dataset.id).await?;
        info!(
            dataset = dataset_name,
            %session,
            examples = examples.len(),
            concurrency = options.concurrency,
            "running concurrent evaluation"
        );

        run_batch(examples, target, options, || {
            let client = self.clone();
            let session = session.clone();
            async move { RunTracer::connect(client, session).await }
        })
        .await
    }

    /// Strictly sequential variant of [`Self::run_on_dataset_concurrent`]:
    /// one tracer, one example at a time
    pub async fn run_on_dataset(
        &self,
        dataset_name: &str,
        target: &EvaluationTarget,
        options: &BatchOptions,
    ) -> TracevalResult<BatchResults> {
        let session = session_label(options.session_name.as_deref(), dataset_name, target);
        let dataset = self.read_dataset(dataset_name).await?;
        let examples = self.list_examples(dataset.id).await?;
        info!(
            dataset = dataset_name,
            %session,
            examples = examples.len(),
            "running sequential evaluation"
        );

        run_batch_sequential(examples, target, options, || {
            let client = self.clone();
            let session = session.clone();
            async move { RunTracer::connect(client, session).await }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::error::TracevalError;
    use crate::target::{Pipeline, PipelineFactory};
    use crate::types::ExampleInputs;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct EchoPipeline;

    #[async_trait]
    impl Pipeline for EchoPipeline {
        async fn run(
            &mut self,
            inputs: &ExampleInputs,
            _tracer: &mut RunTracer,
        ) -> TracevalResult<Value> {
            Ok(Value::Object(inputs.clone()))
        }
    }

    struct EchoFactory;

    impl PipelineFactory for EchoFactory {
        fn pipeline_name(&self) -> &str {
            "echo"
        }

        fn build(&self) -> TracevalResult<Box<dyn Pipeline>> {
            Ok(Box::new(EchoPipeline))
        }
    }

    async fn store_with_dataset(examples: usize) -> (MockServer, Uuid) {
        let server = MockServer::start().await;
        let dataset_id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/datasets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": dataset_id,
                "name": "qa",
                "tenant_id": "t-1",
            }])))
            .mount(&server)
            .await;

        let rows: Vec<Value> = (0..examples)
            .map(|i| {
                json!({
                    "id": Uuid::new_v4(),
                    "dataset_id": dataset_id,
                    "inputs": {"question": format!("q{i}")},
                })
            })
            .collect();
        Mock::given(method("GET"))
            .and(path("/examples"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": Uuid::new_v4(),
                "name": "eval-session",
                "tenant_id": "t-1",
            }])))
            .mount(&server)
            .await;

        (server, dataset_id)
    }

    async fn client_for(server: &MockServer) -> ApiClient {
        let config = ApiConfig::default()
            .with_api_url(server.uri())
            .with_tenant_id("t-1");
        ApiClient::connect(config).await.unwrap()
    }

    #[tokio::test]
    async fn concurrent_entry_point_evaluates_the_whole_dataset() {
        let (server, _) = store_with_dataset(4).await;
        let client = client_for(&server).await;
        let target = EvaluationTarget::factory(Arc::new(EchoFactory));
        let options = BatchOptions::new()
            .with_concurrency(2)
            .with_session_name("eval-session");

        let results = client
            .run_on_dataset_concurrent("qa", &target, &options)
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        for outcomes in results.values() {
            assert_eq!(outcomes.len(), 1);
            assert!(!outcomes[0].is_failure());
        }
    }

    #[tokio::test]
    async fn sequential_entry_point_accumulates_all_examples() {
        let (server, _) = store_with_dataset(3).await;
        let client = client_for(&server).await;
        let target = EvaluationTarget::factory(Arc::new(EchoFactory));
        let options = BatchOptions::new().with_session_name("eval-session");

        let results = client.run_on_dataset("qa", &target, &options).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn bad_concurrency_fails_before_any_evaluation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/datasets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": Uuid::new_v4(),
                "name": "qa",
            }])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/examples"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let target = EvaluationTarget::factory(Arc::new(EchoFactory));
        let options = BatchOptions::new()
            .with_concurrency(0)
            .with_session_name("s");

        let error = client
            .run_on_dataset_concurrent("qa", &target, &options)
            .await
            .unwrap_err();
        assert!(matches!(error, TracevalError::Config(_)));
    }
}
