//! HTTP client for the dataset/trace store
//!
//! Routine CRUD plumbing kept behind a narrow interface: the engine only ever
//! sees datasets, examples, sessions and run records. Idempotent reads retry a
//! fixed three attempts; writes are single-shot.

mod batch;

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::{TracevalError, TracevalResult};
use crate::trace::RunRecord;
use crate::types::{Dataset, Example, ExampleInputs, TracerSession};

const READ_ATTEMPTS: usize = 3;
const READ_RETRY_DELAY: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the dataset/trace store API
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: Client,
}

impl ApiClient {
    /// Validate credentials and resolve the tenant, then hand back a ready
    /// client. Fails before any batch work if the endpoint is unusable.
    pub async fn connect(config: ApiConfig) -> TracevalResult<Self> {
        config.validate()?;
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let mut client = Self { config, http };
        if client.config.tenant_id.is_none() {
            let tenant_id = client.resolve_seeded_tenant().await?;
            debug!(%tenant_id, "resolved seeded tenant");
            client.config.tenant_id = Some(tenant_id);
        }
        Ok(client)
    }

    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.config.tenant_id.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("x-api-key", key),
            None => request,
        }
    }

    async fn ensure_success(response: Response) -> TracevalResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            Err(TracevalError::not_found(body))
        } else {
            Err(TracevalError::http(format!("{status}: {body}")))
        }
    }

    async fn try_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> TracevalResult<T> {
        let mut query: Vec<(&str, String)> = Vec::with_capacity(params.len() + 1);
        if let Some(tenant_id) = &self.config.tenant_id {
            query.push(("tenant_id", tenant_id.clone()));
        }
        query.extend(params.iter().cloned());

        let response = self
            .authorized(self.http.get(self.url(path)))
            .query(&query)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// GET with the fixed read retry: transport and server errors are retried,
    /// everything the server answered coherently (404 included) is not
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> TracevalResult<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_get::<T>(path, params).await {
                Ok(value) => return Ok(value),
                Err(error @ TracevalError::Http(_)) if attempt < READ_ATTEMPTS => {
                    warn!(path, attempt, %error, "store read failed, retrying");
                    sleep(READ_RETRY_DELAY).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> TracevalResult<T> {
        let response = self
            .authorized(self.http.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn resolve_seeded_tenant(&self) -> TracevalResult<String> {
        let tenants: Vec<Value> = self.get_json("/tenants", &[]).await.map_err(|e| {
            TracevalError::config(format!(
                "unable to resolve the default tenant id ({e}); provide one explicitly"
            ))
        })?;
        tenants
            .first()
            .and_then(|tenant| tenant.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| TracevalError::config("no seeded tenant found"))
    }

    /// Resolve a "limit 1 by name" read that some store versions answer with a
    /// list and others with a bare object
    fn first_of<T: DeserializeOwned>(result: Value, missing: String) -> TracevalResult<T> {
        match result {
            Value::Array(mut items) => {
                if items.is_empty() {
                    return Err(TracevalError::not_found(missing));
                }
                Ok(serde_json::from_value(items.swap_remove(0))?)
            }
            other => Ok(serde_json::from_value(other)?),
        }
    }

    // --- datasets ---

    pub async fn create_dataset(
        &self,
        name: &str,
        description: &str,
    ) -> TracevalResult<Dataset> {
        self.post_json(
            "/datasets",
            &json!({
                "name": name,
                "description": description,
                "tenant_id": self.config.tenant_id,
            }),
        )
        .await
    }

    pub async fn read_dataset(&self, name: &str) -> TracevalResult<Dataset> {
        let result: Value = self
            .get_json(
                "/datasets",
                &[("name", name.to_string()), ("limit", "1".to_string())],
            )
            .await?;
        Self::first_of(result, format!("Dataset {name} not found"))
    }

    pub async fn read_dataset_by_id(&self, id: Uuid) -> TracevalResult<Dataset> {
        self.get_json(&format!("/datasets/{id}"), &[]).await
    }

    pub async fn list_datasets(&self, limit: usize) -> TracevalResult<Vec<Dataset>> {
        self.get_json("/datasets", &[("limit", limit.to_string())])
            .await
    }

    pub async fn delete_dataset(&self, id: Uuid) -> TracevalResult<()> {
        let response = self
            .authorized(self.http.delete(self.url(&format!("/datasets/{id}"))))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Upload a CSV of examples as a new dataset. The store splits rows into
    /// inputs/outputs on the given column names.
    pub async fn upload_csv(
        &self,
        csv_path: &Path,
        description: &str,
        input_keys: &[String],
        output_keys: &[String],
    ) -> TracevalResult<Dataset> {
        let file_name = csv_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "examples.csv".to_string());
        let bytes = tokio::fs::read(csv_path).await?;
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str("text/csv")?;
        let mut form = reqwest::multipart::Form::new()
            .text("description", description.to_string())
            .text("input_keys", input_keys.join(","))
            .text("output_keys", output_keys.join(","))
            .part("file", part);
        if let Some(tenant_id) = &self.config.tenant_id {
            form = form.text("tenant_id", tenant_id.clone());
        }

        let response = self
            .authorized(self.http.post(self.url("/datasets/upload")))
            .multipart(form)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        let result: Value = response.json().await?;
        if let Some(detail) = result.get("detail").and_then(Value::as_str) {
            if detail.contains("already exists") {
                return Err(TracevalError::config(format!(
                    "dataset {file_name} already exists"
                )));
            }
        }
        Ok(serde_json::from_value(result)?)
    }

    // --- examples ---

    pub async fn create_example(
        &self,
        dataset_id: Uuid,
        inputs: &ExampleInputs,
        outputs: Option<&ExampleInputs>,
    ) -> TracevalResult<Example> {
        self.post_json(
            "/examples",
            &json!({
                "dataset_id": dataset_id,
                "inputs": inputs,
                "outputs": outputs,
            }),
        )
        .await
    }

    pub async fn read_example(&self, id: Uuid) -> TracevalResult<Example> {
        self.get_json(&format!("/examples/{id}"), &[]).await
    }

    /// Every example of a dataset; ordering is whatever the store returns
    pub async fn list_examples(&self, dataset_id: Uuid) -> TracevalResult<Vec<Example>> {
        self.get_json("/examples", &[("dataset", dataset_id.to_string())])
            .await
    }

    // --- sessions ---

    pub async fn read_session(&self, name: &str) -> TracevalResult<TracerSession> {
        let result: Value = self
            .get_json(
                "/sessions",
                &[("name", name.to_string()), ("limit", "1".to_string())],
            )
            .await?;
        Self::first_of(result, format!("Session {name} not found"))
    }

    pub async fn list_sessions(&self) -> TracevalResult<Vec<TracerSession>> {
        self.get_json("/sessions", &[]).await
    }

    /// Read the named session, creating it when it does not exist yet
    pub async fn ensure_session(&self, name: &str) -> TracevalResult<TracerSession> {
        match self.read_session(name).await {
            Ok(session) => Ok(session),
            Err(TracevalError::NotFound(_)) => {
                self.post_json(
                    "/sessions",
                    &json!({
                        "name": name,
                        "tenant_id": self.config.tenant_id,
                    }),
                )
                .await
            }
            Err(error) => Err(error),
        }
    }

    // --- runs ---

    pub async fn create_run(&self, record: &RunRecord) -> TracevalResult<()> {
        let _: Value = self.post_json("/runs", record).await?;
        Ok(())
    }

    pub async fn read_run(&self, id: Uuid) -> TracevalResult<RunRecord> {
        self.get_json(&format!("/runs/{id}"), &[]).await
    }

    pub async fn list_runs(
        &self,
        session_id: Option<Uuid>,
        run_type: Option<&str>,
    ) -> TracevalResult<Vec<RunRecord>> {
        let mut params = Vec::new();
        if let Some(session_id) = session_id {
            params.push(("session_id", session_id.to_string()));
        }
        if let Some(run_type) = run_type {
            params.push(("run_type", run_type.to_string()));
        }
        self.get_json("/runs", &params).await
    }
}
