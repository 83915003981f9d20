//! Built-in execution backends
//!
//! One adapter per supported framework. Each runs workflows against an
//! out-of-process runtime when `runtime_url` is configured, or as an
//! in-process dry run otherwise.

mod agno;
mod backend;
mod client;
mod crewai;
mod langgraph;
mod n8n;

pub use agno::{AgentAdapter, AGNO_EXECUTION_ERROR};
pub use backend::{plan_steps, BackendOptions, PlannedStep};
pub use client::{RuntimeClient, RuntimeResponse};
pub use crewai::{CrewAdapter, CREWAI_EXECUTION_ERROR};
pub use langgraph::{GraphAgentAdapter, LANGGRAPH_EXECUTION_ERROR};
pub use n8n::{VisualFlowAdapter, N8N_EXECUTION_ERROR};

use orchcore::RegistryError;
use orchruntime::FrameworkRegistry;
use std::sync::Arc;

/// Register all built-in adapters with a registry
pub fn register_all(registry: &FrameworkRegistry) -> Result<(), RegistryError> {
    registry.register(Arc::new(VisualFlowAdapter::new()))?;
    registry.register(Arc::new(GraphAgentAdapter::new()))?;
    registry.register(Arc::new(CrewAdapter::new()))?;
    registry.register(Arc::new(AgentAdapter::new()))?;
    Ok(())
}
