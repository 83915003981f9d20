use crate::backend::{has_parameter, node_label, type_contains, Backend};
use async_trait::async_trait;
use orchcore::{
    AdapterError, ExecutionContext, ExecutionResult, FrameworkAdapter, FrameworkCapabilities,
    FrameworkMetadata, FrameworkType, GraphNode, Parameters, ParsedWorkflow, ResourceRequirements,
    WorkflowCheck,
};
use serde_json::Value;

pub const CREWAI_EXECUTION_ERROR: &str = "CREWAI_EXECUTION_ERROR";

const AGENT_FIELDS: [&str; 3] = ["role", "goal", "backstory"];

fn is_agent(node: &GraphNode) -> bool {
    type_contains(node, "agent")
}

fn is_task(node: &GraphNode) -> bool {
    type_contains(node, "task")
}

fn display_name(node: &GraphNode) -> String {
    node.name().map(str::to_string).unwrap_or_else(|| node_label(node))
}

/// Multi-agent crew backend (CrewAI). Agents and tasks are nodes whose type
/// names them as such.
pub struct CrewAdapter {
    framework: FrameworkType,
    metadata: FrameworkMetadata,
    backend: Backend,
}

impl CrewAdapter {
    pub fn new() -> Self {
        Self {
            framework: FrameworkType::new(FrameworkType::CREWAI),
            metadata: FrameworkMetadata {
                name: "CrewAI".to_string(),
                version: "0.1.0".to_string(),
                description: "Multi-agent collaboration and orchestration framework".to_string(),
                capabilities: FrameworkCapabilities {
                    supports_multi_agent: true,
                    supports_visual_builder: false,
                    supports_code_editor: true,
                    supports_async_execution: true,
                    supports_state_persistence: true,
                    gpu_required: false,
                    max_concurrent_executions: 8,
                    resource_requirements: ResourceRequirements {
                        cpu: 3.0,
                        memory_mb: 3072,
                        gpu: None,
                    },
                },
                supported_languages: vec!["python".to_string()],
                dependencies: vec!["crewai".to_string(), "langchain".to_string()],
            },
            backend: Backend::new("CrewAI", CREWAI_EXECUTION_ERROR),
        }
    }
}

impl Default for CrewAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameworkAdapter for CrewAdapter {
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
        let agents: Vec<_> = workflow.nodes().iter().filter(|n| is_agent(n)).collect();

        if agents.is_empty() {
            errors.push("Crew must have at least one agent".to_string());
        }

        for agent in agents {
            if !AGENT_FIELDS.iter().all(|field| has_parameter(agent, field)) {
                errors.push(format!(
                    "Agent {} is missing required fields (role, goal, backstory)",
                    display_name(agent)
                ));
            }
        }

        for task in workflow.nodes().iter().filter(|n| is_task(n)) {
            if !has_parameter(task, "description") {
                errors.push(format!("Task {} is missing description", display_name(task)));
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
        let agent_count = nodes.iter().filter(|n| is_agent(n)).count().max(1) as u64;
        let task_count = nodes.iter().filter(|n| is_task(n)).count().max(1);

        let mut cpu = 3.0 + (agent_count / 2) as f64;
        let mut memory_mb = 3072 + agent_count * 512;

        if task_count > 5 {
            cpu += 1.0;
        }
        if task_count > 10 {
            cpu += 1.0;
            memory_mb += 1024;
        }

        let gpu_tools = nodes.iter().filter(|n| is_agent(n)).any(|agent| {
            agent
                .parameter("tools")
                .and_then(Value::as_array)
                .map(|tools| {
                    tools.iter().any(|tool| {
                        let kind = tool
                            .get("type")
                            .or(Some(tool))
                            .and_then(Value::as_str)
                            .unwrap_or_default();
                        kind.contains("gpu") || kind.contains("llm")
                    })
                })
                .unwrap_or(false)
        });

        ResourceRequirements {
            cpu,
            memory_mb,
            gpu: gpu_tools.then_some(1),
        }
    }
}
