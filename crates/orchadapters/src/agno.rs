use crate::backend::{has_parameter, type_contains, Backend};
use async_trait::async_trait;
use orchcore::{
    AdapterError, ExecutionContext, ExecutionResult, FrameworkAdapter, FrameworkCapabilities,
    FrameworkMetadata, FrameworkType, GraphNode, Parameters, ParsedWorkflow, ResourceRequirements,
    WorkflowCheck,
};
use serde_json::Value;

pub const AGNO_EXECUTION_ERROR: &str = "AGNO_EXECUTION_ERROR";

fn agent_node(workflow: &ParsedWorkflow) -> Option<&GraphNode> {
    workflow.nodes().iter().find(|n| type_contains(n, "agent"))
}

/// High-performance single-agent backend (Agno), GPU bound.
pub struct AgentAdapter {
    framework: FrameworkType,
    metadata: FrameworkMetadata,
    backend: Backend,
}

impl AgentAdapter {
    pub fn new() -> Self {
        Self {
            framework: FrameworkType::new(FrameworkType::AGNO),
            metadata: FrameworkMetadata {
                name: "Agno".to_string(),
                version: "0.1.0".to_string(),
                description:
                    "High-performance SDK for multi-agent systems with multi-modality support"
                        .to_string(),
                capabilities: FrameworkCapabilities {
                    supports_multi_agent: true,
                    supports_visual_builder: false,
                    supports_code_editor: true,
                    supports_async_execution: true,
                    supports_state_persistence: true,
                    gpu_required: true,
                    max_concurrent_executions: 5,
                    resource_requirements: ResourceRequirements {
                        cpu: 4.0,
                        memory_mb: 4096,
                        gpu: Some(1),
                    },
                },
                supported_languages: vec!["python".to_string()],
                dependencies: ["agno", "torch", "transformers", "vector-db"]
                    .iter()
                    .map(|d| d.to_string())
                    .collect(),
            },
            backend: Backend::new("Agno", AGNO_EXECUTION_ERROR),
        }
    }
}

impl Default for AgentAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameworkAdapter for AgentAdapter {
    fn framework_type(&self) -> &FrameworkType {
        &self.framework
    }

    fn metadata(&self) -> &FrameworkMetadata {
        &self.metadata
    }

    async fn initialize(&self, config: &Value) -> Result<(), AdapterError> {
        self.backend.initialize(config).await
    }

    async fn shutdown(&self) -> Result<(), AdapterError> {
        self.backend.shutdown();
        Ok(())
    }

    async fn validate(&self, workflow: &ParsedWorkflow) -> WorkflowCheck {
        let Some(agent) = agent_node(workflow) else {
            return WorkflowCheck::from_errors(vec![
                "Workflow must contain an agent configuration".to_string()
            ]);
        };

        let mut errors = Vec::new();
        if !has_parameter(agent, "model") {
            errors.push("Agent must specify a model".to_string());
        }
        if agent.parameter("tools").is_some_and(|t| !t.is_null() && !t.is_array()) {
            errors.push("Tools must be an array".to_string());
        }
        if agent.parameter("memory").is_some_and(|m| !m.is_null() && !m.is_object()) {
            errors.push("Memory configuration must be an object".to_string());
        }
        if agent.parameter("multiModal").is_some_and(|m| !m.is_null() && !m.is_boolean()) {
            errors.push("multiModal must be a boolean".to_string());
        }

        WorkflowCheck::from_errors(errors)
    }

    async fn execute(
        &self,
        workflow: &ParsedWorkflow,
        parameters: &Parameters,
        ctx: &ExecutionContext,
    ) -> ExecutionResult {
        let check = self.validate(workflow).await;
        self.backend.execute(check, workflow, parameters, ctx).await
    }

    async fn resource_requirements(&self, workflow: &ParsedWorkflow) -> ResourceRequirements {
        let mut cpu = 4.0;
        let mut memory_mb = 4096;
        let mut gpu = 1;

        let Some(agent) = agent_node(workflow) else {
            return ResourceRequirements {
                cpu,
                memory_mb,
                gpu: Some(gpu),
            };
        };

        if agent.parameter("multiModal").and_then(Value::as_bool) == Some(true) {
            cpu += 2.0;
            memory_mb += 2048;
            gpu += 1;
        }

        let tool_count = agent
            .parameter("tools")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        if tool_count > 5 {
            cpu += 1.0;
            memory_mb += 1024;
        }

        let vector_memory = agent
            .parameter("memory")
            .and_then(|m| m.get("type"))
            .and_then(Value::as_str)
            == Some("vector");
        if vector_memory {
            memory_mb += 2048;
        }

        ResourceRequirements {
            cpu,
            memory_mb,
            gpu: Some(gpu),
        }
    }
}
