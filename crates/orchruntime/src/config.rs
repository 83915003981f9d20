use orchcore::{FrameworkType, OrchError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// 5 MiB
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_EXECUTION_TIMEOUT_MS: u64 = 30_000;

/// Configuration for the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Byte ceiling for workload graph documents
    pub max_document_bytes: usize,
    /// Used when an execution context carries no resource limits
    pub default_timeout_ms: u64,
    pub event_buffer_size: usize,
    /// Initialization options per framework type
    pub adapters: HashMap<String, Value>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            default_timeout_ms: DEFAULT_EXECUTION_TIMEOUT_MS,
            event_buffer_size: 1000,
            adapters: HashMap::new(),
        }
    }
}

impl RuntimeConfig {
    /// Load from a JSON file. Missing keys fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OrchError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, OrchError> {
        let config: Self = serde_json::from_str(raw)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), OrchError> {
        if self.max_document_bytes == 0 {
            return Err(OrchError::Config("max_document_bytes must be positive".to_string()));
        }
        if self.default_timeout_ms == 0 {
            return Err(OrchError::Config("default_timeout_ms must be positive".to_string()));
        }
        if self.event_buffer_size == 0 {
            return Err(OrchError::Config("event_buffer_size must be positive".to_string()));
        }
        Ok(())
    }

    /// Options section for one adapter; an empty object when not configured.
    pub fn adapter_options(&self, framework: &FrameworkType) -> Value {
        self.adapters
            .get(framework.as_str())
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }
}
