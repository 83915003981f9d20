use crate::backend::{node_label, plan_steps, type_contains, Backend};
use async_trait::async_trait;
use orchcore::{
    validate_required_fields, AdapterError, ExecutionContext, ExecutionResult, FrameworkAdapter,
    FrameworkCapabilities, FrameworkMetadata, FrameworkType, Parameters, ParsedWorkflow,
    ResourceRequirements, WorkflowCheck,
};
use serde_json::Value;

pub const LANGGRAPH_EXECUTION_ERROR: &str = "LANGGRAPH_EXECUTION_ERROR";

/// Stateful graph-of-agents backend (LangGraph).
pub struct GraphAgentAdapter {
    framework: FrameworkType,
    metadata: FrameworkMetadata,
    backend: Backend,
}

impl GraphAgentAdapter {
    pub fn new() -> Self {
        Self {
            framework: FrameworkType::new(FrameworkType::LANGGRAPH),
            metadata: FrameworkMetadata {
                name: "LangGraph".to_string(),
                version: "0.1.0".to_string(),
                description: "Stateful multi-step AI agents with graph-based architecture"
                    .to_string(),
                capabilities: FrameworkCapabilities {
                    supports_multi_agent: false,
                    supports_visual_builder: false,
                    supports_code_editor: true,
                    supports_async_execution: true,
                    supports_state_persistence: true,
                    gpu_required: false,
                    max_concurrent_executions: 10,
                    resource_requirements: ResourceRequirements {
                        cpu: 2.0,
                        memory_mb: 2048,
                        gpu: None,
                    },
                },
                supported_languages: vec!["python".to_string()],
                dependencies: vec![
                    "langchain".to_string(),
                    "langgraph".to_string(),
                    "python".to_string(),
                ],
            },
            backend: Backend::new("LangGraph", LANGGRAPH_EXECUTION_ERROR),
        }
    }
}

impl Default for GraphAgentAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameworkAdapter for GraphAgentAdapter {
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
        let mut errors = Vec::new();

        for node in workflow.nodes() {
            let missing = validate_required_fields(node.raw(), &["id", "type"]);
            if !missing.is_empty() {
                errors.push(format!(
                    "Node {} is missing required fields: {}",
                    node_label(node),
                    missing.join(", ")
                ));
            }
        }

        let mut dangling = false;
        for edge in workflow.connections().edges() {
            for end in [&edge.source, &edge.target] {
                if workflow.find_node(end).is_none() {
                    errors.push(format!("Edge references unknown node {}", end));
                    dangling = true;
                }
            }
        }

        // Cycles are only meaningful once every edge resolves.
        if !dangling {
            if let Err(cycle) = plan_steps(workflow) {
                errors.push(cycle);
            }
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
        let nodes = workflow.nodes();
        let edge_count = workflow.connections().edges().len();

        let mut cpu = 2.0;
        let mut memory_mb = 2048;

        if nodes.len() > 10 {
            cpu += 1.0;
        }
        if nodes.len() > 20 {
            cpu += 1.0;
        }
        if edge_count > 15 {
            memory_mb += 1024;
        }
        if edge_count > 30 {
            memory_mb += 1024;
        }

        let has_llm = nodes
            .iter()
            .any(|n| type_contains(n, "llm") || type_contains(n, "openai"));

        ResourceRequirements {
            cpu,
            memory_mb,
            gpu: has_llm.then_some(1),
        }
    }
}
