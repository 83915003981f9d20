use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Caller-supplied parameter values, keyed by parameter name.
pub type Parameters = HashMap<String, Value>;

/// Error codes carried by failed execution envelopes.
pub mod codes {
    pub const EXECUTION_TIMEOUT: &str = "EXECUTION_TIMEOUT";
    pub const EXECUTION_CANCELLED: &str = "EXECUTION_CANCELLED";
    pub const ADAPTER_FAULT: &str = "ADAPTER_FAULT";
    pub const WORKFLOW_INVALID: &str = "WORKFLOW_INVALID";
}

/// Normalized result envelope returned by every adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub output: Value,
    pub execution_time_ms: u64,
    pub resource_usage: ResourceUsage,
    pub steps: Vec<StepRecord>,
    pub error: Option<ExecutionFailure>,
}

impl ExecutionResult {
    /// Failed envelope: null output, zeroed usage, no steps.
    pub fn failure(message: impl Into<String>, code: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            output: Value::Null,
            execution_time_ms,
            resource_usage: ResourceUsage::default(),
            steps: Vec::new(),
            error: Some(ExecutionFailure {
                message: message.into(),
                code: code.into(),
            }),
        }
    }

    pub fn success(
        output: Value,
        execution_time_ms: u64,
        steps: Vec<StepRecord>,
        resource_usage: ResourceUsage,
    ) -> Self {
        Self {
            success: true,
            output,
            execution_time_ms,
            resource_usage,
            steps,
            error: None,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub cpu_time_ms: u64,
    pub memory_peak_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One entry of an execution's step trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub id: String,
    pub name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepRecord {
    pub fn pending(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            output: None,
            error: None,
        }
    }

    pub fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at.get_or_insert_with(Utc::now);
    }

    pub fn complete(&mut self, output: Value) {
        self.finish(StepStatus::Completed);
        self.output = Some(output);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.finish(StepStatus::Failed);
        self.error = Some(error.into());
    }

    fn finish(&mut self, status: StepStatus) {
        let now = Utc::now();
        let started = *self.started_at.get_or_insert(now);
        self.status = status;
        self.completed_at = Some(now);
        self.duration_ms = Some((now - started).num_milliseconds().max(0) as u64);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLimits {
    pub cpu: f64,
    pub memory_mb: u64,
    pub timeout_ms: u64,
}

/// Per-execution context handed to an adapter.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub execution_id: ExecutionId,
    pub workflow_id: Option<String>,
    pub agent_id: Option<String>,
    pub user_id: Option<String>,
    /// Joins log entries and events across components.
    pub correlation_id: String,
    pub resource_limits: Option<ResourceLimits>,
    /// Cancelled when the execution times out or is cancelled by the caller.
    pub cancellation: CancellationToken,
}

impl ExecutionContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            execution_id: ExecutionId::new_v4(),
            workflow_id: None,
            agent_id: None,
            user_id: None,
            correlation_id: correlation_id.into(),
            resource_limits: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_workflow(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        let limits = self.resource_limits.get_or_insert(ResourceLimits {
            cpu: 1.0,
            memory_mb: 512,
            timeout_ms,
        });
        limits.timeout_ms = timeout_ms;
        self
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.resource_limits = Some(limits);
        self
    }

    pub fn timeout_ms(&self) -> Option<u64> {
        self.resource_limits.map(|l| l.timeout_ms)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
