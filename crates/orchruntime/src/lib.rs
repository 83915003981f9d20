//! Orchestration runtime
//!
//! This crate provides the workflow parser, the parameter validator, the
//! framework registry and the orchestrator that routes executions to
//! registered adapters under a hard time bound.

mod config;
pub mod inference;
mod parser;
mod registry;
mod runtime;
mod validator;

pub use config::{RuntimeConfig, DEFAULT_EXECUTION_TIMEOUT_MS, DEFAULT_MAX_DOCUMENT_BYTES};
pub use parser::{
    is_template, is_trigger_type, variable_name, WorkflowParser, NAMED_VARIABLE, TEMPLATE_MARKER,
    TRIGGER_MARKERS,
};
pub use registry::{AdapterState, FrameworkRegistry, ShutdownReport};
pub use runtime::{ExecutionRequest, Orchestrator};
pub use validator::{sanitize_for_logging, ParameterValidator, REDACTED};
