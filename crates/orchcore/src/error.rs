use crate::{FrameworkType, ValidationResult};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchError {
    #[error("Invalid workflow: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Parameter validation failed: {}", .0.summary())]
    ValidationFailed(ValidationResult),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Rejections of a workload graph document. Every variant is user-facing:
/// the caller fixes the input and resubmits.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("workflow document is {size} bytes, exceeding the maximum of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("workflow document is not valid JSON: {0}")]
    Malformed(String),

    #[error("workflow document must be a JSON object")]
    NotAnObject,

    #[error("workflow document is missing the nodes array")]
    MissingNodes,

    #[error("workflow must contain at least one node")]
    EmptyNodes,
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("framework adapter for {0} is already registered")]
    DuplicateFramework(FrameworkType),

    #[error("framework {0} is not supported or registered")]
    UnsupportedFramework(FrameworkType),

    #[error("framework {0} is registered but not initialized")]
    NotInitialized(FrameworkType),

    #[error("{} framework(s) failed to initialize: {}", .failures.len(), describe_failures(.failures))]
    InitializationFailed {
        failures: Vec<(FrameworkType, AdapterError)>,
    },
}

fn describe_failures(failures: &[(FrameworkType, AdapterError)]) -> String {
    failures
        .iter()
        .map(|(framework, err)| format!("{}: {}", framework, err))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Shutdown failed: {0}")]
    Shutdown(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Execution {execution_id} timed out after {timeout_ms}ms")]
    Timeout {
        timeout_ms: u64,
        execution_id: String,
    },

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Adapter fault: {0}")]
    Fault(String),
}
