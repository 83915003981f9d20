use crate::config::RuntimeConfig;
use crate::inference;
use crate::parser::WorkflowParser;
use crate::registry::{FrameworkRegistry, ShutdownReport};
use crate::validator::{sanitize_for_logging, ParameterValidator};
use chrono::Utc;
use futures::FutureExt;
use orchcore::{
    codes, execute_with_timeout, AdapterError, EventBus, EventTags, ExecutionContext,
    ExecutionEvent, ExecutionId, ExecutionResult, FieldType, FrameworkCapabilities, FrameworkType,
    OrchError, ParameterConfig, Parameters, ParsedWorkflow, RegistryError, ResourceRequirements,
    ValidationResult, WorkflowCheck, WorkflowError,
};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Everything needed to dispatch one execution.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub framework: FrameworkType,
    pub workflow: Arc<ParsedWorkflow>,
    pub parameters: Parameters,
    /// Catalog the parameters are validated against
    pub parameter_configs: Vec<ParameterConfig>,
    pub context: ExecutionContext,
}

impl ExecutionRequest {
    pub fn new(
        framework: impl Into<FrameworkType>,
        workflow: Arc<ParsedWorkflow>,
        context: ExecutionContext,
    ) -> Self {
        Self {
            framework: framework.into(),
            workflow,
            parameters: Parameters::new(),
            parameter_configs: Vec::new(),
            context,
        }
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_parameter_configs(mut self, configs: Vec<ParameterConfig>) -> Self {
        self.parameter_configs = configs;
        self
    }
}

/// Main entry point: parses workflows, validates parameters and routes
/// executions to registered adapters under a hard time bound.
pub struct Orchestrator {
    registry: Arc<FrameworkRegistry>,
    parser: WorkflowParser,
    validator: ParameterValidator,
    event_bus: Arc<EventBus>,
    config: RuntimeConfig,
    in_flight: Mutex<HashMap<ExecutionId, CancellationToken>>,
}

impl Orchestrator {
    /// Create an orchestrator with default settings and an empty registry
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_registry(Arc::new(FrameworkRegistry::new()), config)
    }

    /// Create an orchestrator over a pre-populated registry
    pub fn with_registry(registry: Arc<FrameworkRegistry>, config: RuntimeConfig) -> Self {
        Self {
            registry,
            parser: WorkflowParser::new(config.max_document_bytes),
            validator: ParameterValidator::new(),
            event_bus: Arc::new(EventBus::new(config.event_buffer_size)),
            config,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<FrameworkRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Initialize every registered adapter with its configured options
    pub async fn start(&self) -> Result<(), RegistryError> {
        self.registry.initialize_all(&self.config).await
    }

    pub async fn shutdown(&self) -> ShutdownReport {
        self.registry.shutdown_all().await
    }

    pub fn parse(&self, raw: &[u8]) -> Result<ParsedWorkflow, WorkflowError> {
        self.parser.parse(raw)
    }

    pub fn validate_parameters(
        &self,
        values: &Parameters,
        configs: &[ParameterConfig],
    ) -> ValidationResult {
        self.validator.validate_all(values, configs)
    }

    /// Backend-specific structural validation
    pub async fn validate_workflow(
        &self,
        framework: &FrameworkType,
        workflow: &ParsedWorkflow,
    ) -> Result<WorkflowCheck, OrchError> {
        self.registry.require_support(framework)?;
        let adapter = self
            .registry
            .get(framework)
            .ok_or_else(|| RegistryError::UnsupportedFramework(framework.clone()))?;

        match AssertUnwindSafe(adapter.validate(workflow)).catch_unwind().await {
            Ok(check) => Ok(check),
            Err(_) => {
                tracing::error!("Workflow validation panicked for {}", framework);
                Ok(WorkflowCheck::from_errors(vec!["Validation failed".to_string()]))
            }
        }
    }

    pub async fn resource_requirements(
        &self,
        framework: &FrameworkType,
        workflow: &ParsedWorkflow,
    ) -> Result<ResourceRequirements, RegistryError> {
        let adapter = self
            .registry
            .get(framework)
            .ok_or_else(|| RegistryError::UnsupportedFramework(framework.clone()))?;
        Ok(adapter.resource_requirements(workflow).await)
    }

    pub fn supported_frameworks(&self) -> Vec<FrameworkType> {
        self.registry.list()
    }

    pub fn capabilities(
        &self,
        framework: &FrameworkType,
    ) -> Result<FrameworkCapabilities, RegistryError> {
        self.registry
            .metadata(framework)
            .map(|m| m.capabilities)
            .ok_or_else(|| RegistryError::UnsupportedFramework(framework.clone()))
    }

    /// Validate the request and run it on its framework's adapter.
    ///
    /// Registry misuse and invalid parameters are errors. Anything that goes
    /// wrong once the adapter runs (timeout, cancellation, panic) comes back
    /// as a failed envelope.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult, OrchError> {
        let ExecutionRequest {
            framework,
            workflow,
            parameters,
            parameter_configs,
            context,
        } = request;

        self.registry.require_support(&framework)?;

        let validation = self.validator.validate_all(&parameters, &parameter_configs);
        if !validation.is_valid {
            tracing::warn!(
                execution_id = %context.execution_id,
                correlation_id = %context.correlation_id,
                "Rejected parameters: {}",
                validation.summary()
            );
            return Err(OrchError::ValidationFailed(validation));
        }

        let adapter = self.registry.dispatch_target(&framework)?;
        let timeout_ms = context.timeout_ms().unwrap_or(self.config.default_timeout_ms);

        let span = tracing::info_span!(
            "execution",
            execution_id = %context.execution_id,
            framework = %framework,
            workflow_id = ?context.workflow_id,
            agent_id = ?context.agent_id,
            correlation_id = %context.correlation_id,
        );

        let sensitive = sensitive_keys(&workflow, &parameter_configs);
        tracing::debug!(
            parent: &span,
            parameters = ?sanitize_for_logging(&parameters, &sensitive),
            "Dispatching execution"
        );

        let result = self
            .run(adapter, framework, workflow, parameters, context, timeout_ms)
            .instrument(span)
            .await;
        Ok(result)
    }

    async fn run(
        &self,
        adapter: Arc<dyn orchcore::FrameworkAdapter>,
        framework: FrameworkType,
        workflow: Arc<ParsedWorkflow>,
        parameters: Parameters,
        context: ExecutionContext,
        timeout_ms: u64,
    ) -> ExecutionResult {
        let tags = EventTags::from(&context);
        let execution_id = context.execution_id;
        let token = context.cancellation.clone();
        self.track(execution_id, token.clone());

        self.event_bus.emit(ExecutionEvent::ExecutionStarted {
            tags: tags.clone(),
            framework: framework.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!("Starting execution on {}", framework);

        let started = Instant::now();
        let task = tokio::spawn(
            async move { adapter.execute(&workflow, &parameters, &context).await }
                .in_current_span(),
        );
        let guard = InFlightGuard {
            in_flight: &self.in_flight,
            execution_id,
            token: token.clone(),
            abort: task.abort_handle(),
            finished: false,
        };

        let watched = {
            let token = token.clone();
            async move {
                tokio::select! {
                    joined = task => joined.map_err(|e| {
                        if e.is_panic() {
                            AdapterError::Fault(panic_message(e.into_panic()))
                        } else {
                            AdapterError::Cancelled
                        }
                    }),
                    _ = token.cancelled() => Err(AdapterError::Cancelled),
                }
            }
        };

        let outcome = execute_with_timeout(watched, timeout_ms, execution_id).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(result) => result,
            Err(AdapterError::Timeout { .. }) => {
                token.cancel();
                ExecutionResult::failure(
                    format!("Execution timeout after {}ms", timeout_ms),
                    codes::EXECUTION_TIMEOUT,
                    elapsed_ms,
                )
            }
            Err(AdapterError::Cancelled) => {
                self.event_bus.emit(ExecutionEvent::ExecutionCancelled {
                    tags: tags.clone(),
                    timestamp: Utc::now(),
                });
                ExecutionResult::failure("Execution cancelled", codes::EXECUTION_CANCELLED, elapsed_ms)
            }
            Err(e) => {
                tracing::error!("Adapter fault: {}", e);
                ExecutionResult::failure(e.to_string(), codes::ADAPTER_FAULT, elapsed_ms)
            }
        };

        guard.finish();

        if result.success {
            tracing::info!("Execution completed in {}ms", elapsed_ms);
        } else {
            tracing::warn!(
                "Execution failed after {}ms: {}",
                elapsed_ms,
                result.error_code().unwrap_or("UNKNOWN")
            );
        }

        self.event_bus.emit(ExecutionEvent::ExecutionCompleted {
            tags,
            framework,
            success: result.success,
            duration_ms: elapsed_ms,
            error_code: result.error_code().map(str::to_string),
            timestamp: Utc::now(),
        });

        result
    }

    /// Cancel an in-flight execution. Returns false when no such execution
    /// is running.
    pub fn cancel(&self, execution_id: &ExecutionId) -> bool {
        let token = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(execution_id)
            .cloned();

        match token {
            Some(token) => {
                token.cancel();
                tracing::info!("Cancelled execution {}", execution_id);
                true
            }
            None => false,
        }
    }

    /// Executions currently dispatched to an adapter
    pub fn in_flight(&self) -> Vec<ExecutionId> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    fn track(&self, execution_id: ExecutionId, token: CancellationToken) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(execution_id, token);
    }

}

/// Releases an in-flight execution: aborts the adapter task and drops the
/// tracking entry. If the execution future is dropped before it finishes,
/// the context token is cancelled as well.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashMap<ExecutionId, CancellationToken>>,
    execution_id: ExecutionId,
    token: CancellationToken,
    abort: AbortHandle,
    finished: bool,
}

impl InFlightGuard<'_> {
    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("Execution {} abandoned by caller", self.execution_id);
            self.token.cancel();
        }
        self.abort.abort();
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.execution_id);
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters never written to logs in clear: inferred secrets plus
/// anything the catalog declares as a password.
fn sensitive_keys(workflow: &ParsedWorkflow, configs: &[ParameterConfig]) -> Vec<String> {
    let mut keys = inference::sensitive_keys(workflow);
    for config in configs {
        if FieldType::parse(&config.declared_type) == Some(FieldType::Password)
            && !keys.contains(&config.name)
        {
            keys.push(config.name.clone());
        }
    }
    keys
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("adapter panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("adapter panicked: {}", s)
    } else {
        "adapter panicked".to_string()
    }
}
