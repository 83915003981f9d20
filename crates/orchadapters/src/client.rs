use orchcore::{AdapterError, ExecutionId, Parameters, ResourceUsage};
use serde_json::{json, Value};

/// HTTP client for an out-of-process framework runtime.
///
/// Runtimes expose `GET /health` and `POST /execute`; the latter takes
/// `{config, inputs, executionId}` and answers with a JSON object carrying
/// `output` (and optionally `resourceUsage`), or `error` on failure.
#[derive(Debug, Clone)]
pub struct RuntimeClient {
    client: reqwest::Client,
    base_url: String,
}

/// Successful answer of a runtime.
#[derive(Debug, Clone)]
pub struct RuntimeResponse {
    pub output: Value,
    pub resource_usage: Option<ResourceUsage>,
}

impl RuntimeClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AdapterError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AdapterError::Configuration(format!(
                "runtime_url must be an http(s) URL, got '{}'",
                base_url
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<(), AdapterError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AdapterError::Initialization(format!("Runtime unreachable at {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AdapterError::Initialization(format!(
                "Runtime health check returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    pub async fn execute(
        &self,
        document: &Value,
        inputs: &Parameters,
        execution_id: ExecutionId,
    ) -> Result<RuntimeResponse, AdapterError> {
        let url = format!("{}/execute", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "config": document,
                "inputs": inputs,
                "executionId": execution_id,
            }))
            .send()
            .await
            .map_err(|e| AdapterError::Runtime(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AdapterError::Runtime(format!("Failed to read runtime response: {}", e)))?;

        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            let message = error
                .as_str()
                .map(str::to_string)
                .or_else(|| error.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| error.to_string());
            return Err(AdapterError::Runtime(message));
        }
        if !status.is_success() {
            return Err(AdapterError::Runtime(format!("Runtime returned {}", status)));
        }

        let resource_usage = body
            .get("resourceUsage")
            .and_then(|u| serde_json::from_value(u.clone()).ok());
        let output = body.get("output").cloned().unwrap_or(body);

        Ok(RuntimeResponse {
            output,
            resource_usage,
        })
    }
}
