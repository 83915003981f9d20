//! Core abstractions for the orchestration engine
//!
//! This crate provides the data model shared by the parser, validator,
//! registry and every execution backend: workload graph types, parameter
//! validation types, the execution envelope and the adapter contract.

mod adapter;
mod error;
mod events;
mod execution;
mod framework;
mod validation;
mod workflow;

pub use adapter::{
    execute_with_timeout, validate_required_fields, validate_structure, FrameworkAdapter,
    WorkflowCheck,
};
pub use error::{AdapterError, OrchError, RegistryError, WorkflowError};
pub use events::{EventBus, EventTags, ExecutionEvent};
pub use execution::{
    codes, ExecutionContext, ExecutionFailure, ExecutionId, ExecutionResult, Parameters,
    ResourceLimits, ResourceUsage, StepRecord, StepStatus,
};
pub use framework::{FrameworkCapabilities, FrameworkMetadata, FrameworkType, ResourceRequirements};
pub use validation::{
    FieldType, ParameterConfig, ValidationError, ValidationResult, ValidationRule,
};
pub use workflow::{
    Connections, Edge, GraphNode, ParameterDescriptor, ParsedWorkflow, TriggerNode,
};

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, OrchError>;
