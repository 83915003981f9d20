use crate::client::RuntimeClient;
use orchcore::{
    codes, execute_with_timeout, AdapterError, ExecutionContext, ExecutionResult, GraphNode,
    Parameters, ParsedWorkflow, ResourceUsage, StepRecord, WorkflowCheck,
};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{PoisonError, RwLock};
use std::time::Instant;
use tokio::time::{sleep, Duration};

/// Initialization options understood by every built-in adapter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendOptions {
    /// Base URL of an out-of-process runtime. Without it the adapter runs
    /// workflows in-process as a dry run.
    pub runtime_url: Option<String>,
    /// Bound on the runtime health probe during initialization
    pub init_timeout_ms: u64,
    /// Simulated work per node in dry-run mode
    pub step_delay_ms: u64,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            runtime_url: None,
            init_timeout_ms: 10_000,
            step_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone)]
enum Mode {
    Remote(RuntimeClient),
    DryRun { step_delay_ms: u64 },
}

/// One node to execute, in execution order.
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub id: String,
    pub name: String,
    pub node_type: String,
}

impl PlannedStep {
    fn from_node(position: usize, node: &GraphNode) -> Self {
        let id = node.id().unwrap_or_else(|| position.to_string());
        let node_type = node.node_type().unwrap_or("unknown").to_string();
        Self {
            name: format!("Execute {}", node.name().unwrap_or(&node_type)),
            id,
            node_type,
        }
    }
}

/// Order nodes so every node comes after the nodes feeding it. Connections
/// to unknown nodes are ignored here; adapters report them in `validate`.
pub fn plan_steps(workflow: &ParsedWorkflow) -> Result<Vec<PlannedStep>, String> {
    let nodes = workflow.nodes();
    let mut graph = DiGraph::<usize, ()>::new();
    let indices: Vec<_> = (0..nodes.len()).map(|i| graph.add_node(i)).collect();

    let position = |reference: &str| nodes.iter().position(|n| n.is_referenced_by(reference));
    for edge in workflow.connections().edges() {
        if let (Some(from), Some(to)) = (position(&edge.source), position(&edge.target)) {
            graph.add_edge(indices[from], indices[to], ());
        }
    }

    let order = toposort(&graph, None).map_err(|cycle| {
        let node = &nodes[graph[cycle.node_id()]];
        format!(
            "Workflow graph contains a cycle through node {}",
            node.id().unwrap_or_else(|| "unknown".to_string())
        )
    })?;

    Ok(order
        .into_iter()
        .map(|idx| {
            let position = graph[idx];
            PlannedStep::from_node(position, &nodes[position])
        })
        .collect())
}

/// Execution machinery shared by the built-in adapters: remote runtime or
/// in-process dry run, step trace, cancellation and envelope building.
pub struct Backend {
    label: &'static str,
    error_code: &'static str,
    mode: RwLock<Option<Mode>>,
}

impl Backend {
    pub fn new(label: &'static str, error_code: &'static str) -> Self {
        Self {
            label,
            error_code,
            mode: RwLock::new(None),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.mode
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub async fn initialize(&self, config: &Value) -> Result<(), AdapterError> {
        let options: BackendOptions = if config.is_null() {
            BackendOptions::default()
        } else {
            serde_json::from_value(config.clone())
                .map_err(|e| AdapterError::Configuration(e.to_string()))?
        };

        let mode = match options.runtime_url {
            Some(url) => {
                let client = RuntimeClient::new(url)?;
                execute_with_timeout(client.health(), options.init_timeout_ms, "initialize")
                    .await
                    .map_err(|e| match e {
                        AdapterError::Timeout { timeout_ms, .. } => AdapterError::Initialization(
                            format!("Runtime health check timed out after {}ms", timeout_ms),
                        ),
                        other => other,
                    })?;
                tracing::info!("{} adapter using runtime at {}", self.label, client.base_url());
                Mode::Remote(client)
            }
            None => {
                tracing::info!("{} adapter running workflows in-process", self.label);
                Mode::DryRun {
                    step_delay_ms: options.step_delay_ms,
                }
            }
        };

        *self.mode.write().unwrap_or_else(PoisonError::into_inner) = Some(mode);
        Ok(())
    }

    pub fn shutdown(&self) {
        self.mode
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        tracing::info!("{} adapter shutdown complete", self.label);
    }

    /// Execute a workflow the adapter has already checked. An invalid or
    /// cyclic workflow never reaches the runtime.
    pub async fn execute(
        &self,
        check: WorkflowCheck,
        workflow: &ParsedWorkflow,
        parameters: &Parameters,
        ctx: &ExecutionContext,
    ) -> ExecutionResult {
        let started = Instant::now();
        if !check.valid {
            tracing::warn!(
                execution_id = %ctx.execution_id,
                "Rejected {} workflow: {}",
                self.label,
                check.errors.join("; ")
            );
            return ExecutionResult::failure(
                format!("Invalid workflow: {}", check.errors.join("; ")),
                codes::WORKFLOW_INVALID,
                elapsed_ms(started),
            );
        }

        match plan_steps(workflow) {
            Ok(plan) => self.run(workflow, plan, parameters, ctx).await,
            Err(message) => {
                ExecutionResult::failure(message, codes::WORKFLOW_INVALID, elapsed_ms(started))
            }
        }
    }

    async fn run(
        &self,
        workflow: &ParsedWorkflow,
        plan: Vec<PlannedStep>,
        parameters: &Parameters,
        ctx: &ExecutionContext,
    ) -> ExecutionResult {
        let started = Instant::now();
        tracing::info!(
            execution_id = %ctx.execution_id,
            workflow_id = ?ctx.workflow_id,
            agent_id = ?ctx.agent_id,
            correlation_id = %ctx.correlation_id,
            "Starting {} execution",
            self.label
        );

        let mode = self
            .mode
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(mode) = mode else {
            return ExecutionResult::failure(
                format!("{} adapter is not initialized", self.label),
                self.error_code,
                elapsed_ms(started),
            );
        };

        let node_count = workflow.nodes().len();
        let connection_count = workflow.connections().len();
        let mut init = StepRecord::pending("workflow_init", "Initialize Workflow");
        init.start();
        init.complete(json!({ "nodeCount": node_count, "connectionCount": connection_count }));

        let mut steps = vec![init];
        steps.extend(plan.iter().map(|p| StepRecord::pending(format!("node_{}", p.id), p.name.clone())));

        let outcome = match mode {
            Mode::Remote(client) => {
                let document = workflow.to_document();
                tokio::select! {
                    response = client.execute(&document, parameters, ctx.execution_id) => {
                        response.map(|r| {
                            for step in steps.iter_mut().skip(1) {
                                step.start();
                                step.complete(Value::Null);
                            }
                            (r.output, r.resource_usage)
                        })
                    }
                    _ = ctx.cancellation.cancelled() => Err(AdapterError::Cancelled),
                }
            }
            Mode::DryRun { step_delay_ms } => {
                dry_run(&plan, &mut steps[1..], parameters, ctx, step_delay_ms)
                    .await
                    .map(|results| {
                        let output = json!({
                            "message": format!("{} workflow executed successfully", self.label),
                            "workflow": {
                                "nodeCount": node_count,
                                "connectionCount": connection_count,
                            },
                            "results": results,
                            "summary": {
                                "totalNodes": node_count,
                                "executedNodes": plan.len(),
                                "dataFlow": parameters,
                            },
                        });
                        (output, None)
                    })
            }
        };

        let execution_time_ms = elapsed_ms(started);
        match outcome {
            Ok((output, usage)) => {
                tracing::info!(
                    execution_id = %ctx.execution_id,
                    correlation_id = %ctx.correlation_id,
                    "Completed {} execution in {}ms",
                    self.label,
                    execution_time_ms
                );
                let usage = usage.unwrap_or(ResourceUsage {
                    cpu_time_ms: execution_time_ms,
                    memory_peak_bytes: 0,
                });
                ExecutionResult::success(output, execution_time_ms, steps, usage)
            }
            Err(AdapterError::Cancelled) => {
                tracing::warn!(execution_id = %ctx.execution_id, "{} execution cancelled", self.label);
                ExecutionResult::failure("Execution cancelled", codes::EXECUTION_CANCELLED, execution_time_ms)
            }
            Err(e) => {
                tracing::error!(
                    execution_id = %ctx.execution_id,
                    correlation_id = %ctx.correlation_id,
                    "{} execution failed: {}",
                    self.label,
                    e
                );
                ExecutionResult::failure(e.to_string(), self.error_code, execution_time_ms)
            }
        }
    }
}

async fn dry_run(
    plan: &[PlannedStep],
    steps: &mut [StepRecord],
    parameters: &Parameters,
    ctx: &ExecutionContext,
    step_delay_ms: u64,
) -> Result<Vec<Value>, AdapterError> {
    let mut results = Vec::with_capacity(plan.len());

    for (planned, step) in plan.iter().zip(steps.iter_mut()) {
        step.start();

        if step_delay_ms > 0 {
            tokio::select! {
                _ = sleep(Duration::from_millis(step_delay_ms)) => {}
                _ = ctx.cancellation.cancelled() => {
                    step.fail("Execution cancelled");
                    return Err(AdapterError::Cancelled);
                }
            }
        } else if ctx.is_cancelled() {
            step.fail("Execution cancelled");
            return Err(AdapterError::Cancelled);
        }

        let output = json!({
            "nodeType": planned.node_type,
            "result": format!("Node {} executed successfully", planned.id),
            "dataProcessed": parameters,
        });
        step.complete(output.clone());
        results.push(output);
    }

    Ok(results)
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Identifier used in validation messages.
pub(crate) fn node_label(node: &GraphNode) -> String {
    node.id().unwrap_or_else(|| "unknown".to_string())
}

/// Whether `node` carries a non-empty parameter under `key`.
pub(crate) fn has_parameter(node: &GraphNode, key: &str) -> bool {
    match node.parameter(key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

pub(crate) fn type_contains(node: &GraphNode, needle: &str) -> bool {
    node.node_type()
        .map(|t| t.to_lowercase().contains(needle))
        .unwrap_or(false)
}
