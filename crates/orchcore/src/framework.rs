use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier selecting which execution backend runs a workload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameworkType(String);

impl FrameworkType {
    pub const LANGGRAPH: &'static str = "langgraph";
    pub const CREWAI: &'static str = "crewai";
    pub const AGNO: &'static str = "agno";
    pub const N8N: &'static str = "n8n";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrameworkType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FrameworkType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Descriptor published by every adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    pub capabilities: FrameworkCapabilities,
    pub supported_languages: Vec<String>,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkCapabilities {
    pub supports_multi_agent: bool,
    pub supports_visual_builder: bool,
    pub supports_code_editor: bool,
    pub supports_async_execution: bool,
    pub supports_state_persistence: bool,
    pub gpu_required: bool,
    pub max_concurrent_executions: u32,
    pub resource_requirements: ResourceRequirements,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    pub cpu: f64,
    pub memory_mb: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<u32>,
}

impl Default for ResourceRequirements {
    fn default() -> Self {
        Self {
            cpu: 1.0,
            memory_mb: 512,
            gpu: None,
        }
    }
}
