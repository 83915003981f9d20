// crates/orchruntime/tests/common/mod.rs

#![allow(dead_code)]

use async_trait::async_trait;
use orchcore::{
    AdapterError, ExecutionContext, ExecutionResult, FrameworkAdapter, FrameworkCapabilities,
    FrameworkMetadata, FrameworkType, Parameters, ParsedWorkflow, ResourceRequirements,
    ResourceUsage, WorkflowCheck,
};
use orchruntime::WorkflowParser;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

/// What the mock does when asked to execute.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Echo,
    Sleep(u64),
    /// Sleeps but returns early once the context is cancelled
    Cooperative(u64),
    Panic,
}

pub struct MockAdapter {
    framework: FrameworkType,
    metadata: FrameworkMetadata,
    behavior: Behavior,
    fail_init: bool,
    fail_shutdown: bool,
    pub init_calls: AtomicUsize,
    pub shutdown_calls: AtomicUsize,
    /// Executions that ran to the end of their behavior
    pub completed_calls: AtomicUsize,
    pub last_config: Mutex<Option<Value>>,
}

impl MockAdapter {
    pub fn new(framework: &str) -> Self {
        Self {
            framework: FrameworkType::new(framework),
            metadata: FrameworkMetadata {
                name: format!("Mock {}", framework),
                version: "0.0.1".to_string(),
                description: "Test double".to_string(),
                capabilities: FrameworkCapabilities {
                    supports_multi_agent: false,
                    supports_visual_builder: false,
                    supports_code_editor: true,
                    supports_async_execution: true,
                    supports_state_persistence: false,
                    gpu_required: false,
                    max_concurrent_executions: 2,
                    resource_requirements: ResourceRequirements {
                        cpu: 0.5,
                        memory_mb: 128,
                        gpu: None,
                    },
                },
                supported_languages: vec!["rust".to_string()],
                dependencies: Vec::new(),
            },
            behavior: Behavior::Echo,
            fail_init: false,
            fail_shutdown: false,
            init_calls: AtomicUsize::new(0),
            shutdown_calls: AtomicUsize::new(0),
            completed_calls: AtomicUsize::new(0),
            last_config: Mutex::new(None),
        }
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_shutdown(mut self) -> Self {
        self.fail_shutdown = true;
        self
    }
}

#[async_trait]
impl FrameworkAdapter for MockAdapter {
    fn framework_type(&self) -> &FrameworkType {
        &self.framework
    }

    fn metadata(&self) -> &FrameworkMetadata {
        &self.metadata
    }

    async fn initialize(&self, config: &Value) -> Result<(), AdapterError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().unwrap() = Some(config.clone());
        sleep(Duration::from_millis(10)).await;
        if self.fail_init {
            return Err(AdapterError::Initialization("runtime missing".to_string()));
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), AdapterError> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        sleep(Duration::from_millis(10)).await;
        if self.fail_shutdown {
            return Err(AdapterError::Shutdown("process stuck".to_string()));
        }
        Ok(())
    }

    async fn validate(&self, workflow: &ParsedWorkflow) -> WorkflowCheck {
        if workflow.triggers().is_empty() {
            WorkflowCheck::from_errors(vec!["no trigger".to_string()])
        } else {
            WorkflowCheck::ok()
        }
    }

    async fn execute(
        &self,
        _workflow: &ParsedWorkflow,
        parameters: &Parameters,
        ctx: &ExecutionContext,
    ) -> ExecutionResult {
        match self.behavior {
            Behavior::Echo => {}
            Behavior::Sleep(ms) => sleep(Duration::from_millis(ms)).await,
            Behavior::Cooperative(ms) => {
                tokio::select! {
                    _ = sleep(Duration::from_millis(ms)) => {}
                    _ = ctx.cancellation.cancelled() => {
                        return ExecutionResult::failure("stopped", "MOCK_STOPPED", 0);
                    }
                }
            }
            Behavior::Panic => panic!("mock adapter exploded"),
        }
        self.completed_calls.fetch_add(1, Ordering::SeqCst);

        ExecutionResult::success(
            json!({ "echo": parameters }),
            1,
            Vec::new(),
            ResourceUsage::default(),
        )
    }
}

pub fn workflow() -> Arc<ParsedWorkflow> {
    let doc = json!({
        "nodes": [
            { "id": "start", "type": "manual-trigger", "parameters": {} },
            { "id": "call", "type": "http", "parameters": {
                "url": "{{ $json.endpoint }}",
                "apiKey": "{{ $json.apiKey }}"
            } }
        ],
        "connections": {
            "start": { "main": [[ { "node": "call", "type": "main", "index": 0 } ]] }
        }
    });
    Arc::new(WorkflowParser::default().parse_str(&doc.to_string()).unwrap())
}
