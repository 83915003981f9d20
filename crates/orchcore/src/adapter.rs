use crate::{
    AdapterError, ExecutionContext, ExecutionResult, FrameworkMetadata, FrameworkType, Parameters,
    ParsedWorkflow, ResourceRequirements,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use tokio::time::{timeout, Duration};

/// Contract every execution backend implements.
///
/// Adapters are shared behind `Arc` by the registry, so every method takes
/// `&self`; backends keep mutable state behind their own locks.
#[async_trait]
pub trait FrameworkAdapter: Send + Sync {
    /// Identifier the registry routes on (e.g. "langgraph", "n8n")
    fn framework_type(&self) -> &FrameworkType;

    fn metadata(&self) -> &FrameworkMetadata;

    /// Prepare backend resources. `config` is this adapter's options section.
    async fn initialize(&self, config: &Value) -> Result<(), AdapterError>;

    /// Release backend resources.
    async fn shutdown(&self) -> Result<(), AdapterError>;

    /// Backend-specific structural checks on a parsed workflow.
    async fn validate(&self, workflow: &ParsedWorkflow) -> WorkflowCheck;

    /// Run the workflow. Failures are reported through the envelope, never
    /// as a panic or an error return.
    async fn execute(
        &self,
        workflow: &ParsedWorkflow,
        parameters: &Parameters,
        ctx: &ExecutionContext,
    ) -> ExecutionResult;

    /// Optional: estimate what a workflow needs to run
    async fn resource_requirements(&self, _workflow: &ParsedWorkflow) -> ResourceRequirements {
        self.metadata().capabilities.resource_requirements
    }
}

/// Outcome of an adapter's structural validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowCheck {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl WorkflowCheck {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn ok() -> Self {
        Self::from_errors(Vec::new())
    }
}

/// Messages for every field of `requiredFields` missing from `data`.
pub fn validate_required_fields(data: &Value, required_fields: &[&str]) -> Vec<String> {
    required_fields
        .iter()
        .filter(|field| data.get(**field).is_none())
        .map(|field| format!("Missing required field: {}", field))
        .collect()
}

/// Minimal structural check shared by all backends.
pub fn validate_structure(data: &Value) -> WorkflowCheck {
    match data {
        Value::Null => WorkflowCheck::from_errors(vec!["Workflow data is required".to_string()]),
        Value::Object(_) => WorkflowCheck::ok(),
        _ => WorkflowCheck::from_errors(vec!["Workflow data must be an object".to_string()]),
    }
}

/// Run `operation`, failing with [`AdapterError::Timeout`] once `timeout_ms`
/// has elapsed. On timeout the operation is dropped and its result, if any,
/// is never observed.
pub async fn execute_with_timeout<F, T>(
    operation: F,
    timeout_ms: u64,
    execution_id: impl Display,
) -> Result<T, AdapterError>
where
    F: Future<Output = Result<T, AdapterError>>,
{
    match timeout(Duration::from_millis(timeout_ms), operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("Execution {} timed out after {}ms", execution_id, timeout_ms);
            Err(AdapterError::Timeout {
                timeout_ms,
                execution_id: execution_id.to_string(),
            })
        }
    }
}
