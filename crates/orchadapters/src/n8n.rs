use crate::backend::{has_parameter, node_label, type_contains, Backend};
use async_trait::async_trait;
use orchcore::{
    validate_required_fields, validate_structure, AdapterError, ExecutionContext, ExecutionResult,
    FrameworkAdapter, FrameworkCapabilities, FrameworkMetadata, FrameworkType, Parameters,
    ParsedWorkflow, ResourceRequirements, WorkflowCheck,
};
use serde_json::Value;

pub const N8N_EXECUTION_ERROR: &str = "N8N_EXECUTION_ERROR";

const START_NODE_KINDS: [&str; 2] = ["schedule", "manual"];
const AI_NODE_KINDS: [&str; 3] = ["openai", "anthropic", "langchain"];
const HEAVY_NODE_KINDS: [&str; 2] = ["transform", "aggregate"];

/// Visual workflow automation backend (n8n documents).
pub struct VisualFlowAdapter {
    framework: FrameworkType,
    metadata: FrameworkMetadata,
    backend: Backend,
}

impl VisualFlowAdapter {
    pub fn new() -> Self {
        Self {
            framework: FrameworkType::new(FrameworkType::N8N),
            metadata: FrameworkMetadata {
                name: "n8n".to_string(),
                version: "0.1.0".to_string(),
                description: "Visual workflow automation platform with AI capabilities".to_string(),
                capabilities: FrameworkCapabilities {
                    supports_multi_agent: false,
                    supports_visual_builder: true,
                    supports_code_editor: false,
                    supports_async_execution: true,
                    supports_state_persistence: true,
                    gpu_required: false,
                    max_concurrent_executions: 15,
                    resource_requirements: ResourceRequirements {
                        cpu: 2.0,
                        memory_mb: 2048,
                        gpu: None,
                    },
                },
                supported_languages: vec!["typescript".to_string(), "javascript".to_string()],
                dependencies: vec!["n8n-core".to_string(), "n8n-nodes-base".to_string()],
            },
            backend: Backend::new("n8n", N8N_EXECUTION_ERROR),
        }
    }
}

impl Default for VisualFlowAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameworkAdapter for VisualFlowAdapter {
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
        let document = workflow.to_document();
        let mut errors = validate_structure(&document).errors;
        let nodes = workflow.nodes();

        let has_start = !workflow.triggers().is_empty()
            || nodes
                .iter()
                .any(|n| START_NODE_KINDS.iter().any(|kind| type_contains(n, kind)));
        if !has_start {
            errors.push(
                "Workflow must have a start node (webhook, schedule, or manual trigger)".to_string(),
            );
        }

        for node in nodes {
            let missing = validate_required_fields(node.raw(), &["id", "type", "parameters"]);
            if !missing.is_empty() {
                errors.push(format!(
                    "Node {} is missing required fields: {}",
                    node_label(node),
                    missing.join(", ")
                ));
            }

            if AI_NODE_KINDS.iter().any(|kind| type_contains(node, kind))
                && !has_parameter(node, "apiKey")
            {
                errors.push(format!("AI node {} is missing API key", node_label(node)));
            }
        }

        for edge in workflow.connections().edges() {
            if workflow.find_node(&edge.source).is_none() {
                errors.push(format!("Connection source {} is not a known node", edge.source));
            }
            if workflow.find_node(&edge.target).is_none() {
                errors.push(format!(
                    "Connection from {} targets unknown node {}",
                    edge.source, edge.target
                ));
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
        let node_count = nodes.len();
        let connection_count = workflow.connections().len();

        let mut cpu = 2.0;
        let mut memory_mb = 2048;

        if node_count > 10 {
            cpu += 1.0;
        }
        if node_count > 20 {
            cpu += 1.0;
        }
        if connection_count > 15 {
            memory_mb += 512;
        }
        if connection_count > 30 {
            memory_mb += 512;
        }

        let has_ai = nodes
            .iter()
            .any(|n| AI_NODE_KINDS.iter().any(|kind| type_contains(n, kind)));
        if has_ai {
            cpu += 1.0;
            memory_mb += 1024;
        }

        if nodes
            .iter()
            .any(|n| HEAVY_NODE_KINDS.iter().any(|kind| type_contains(n, kind)))
        {
            cpu += 0.5;
            memory_mb += 256;
        }

        ResourceRequirements {
            cpu: f64::ceil(cpu),
            memory_mb,
            gpu: has_ai.then_some(1),
        }
    }
}
