use crate::{ExecutionId, FrameworkType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted while executions are dispatched.
///
/// Every event carries the identifiers an external log or trace sink joins
/// on: execution, workflow, agent and correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    ExecutionStarted {
        tags: EventTags,
        framework: FrameworkType,
        timestamp: DateTime<Utc>,
    },
    ExecutionCompleted {
        tags: EventTags,
        framework: FrameworkType,
        success: bool,
        duration_ms: u64,
        error_code: Option<String>,
        timestamp: DateTime<Utc>,
    },
    ExecutionCancelled {
        tags: EventTags,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    pub fn tags(&self) -> &EventTags {
        match self {
            Self::ExecutionStarted { tags, .. }
            | Self::ExecutionCompleted { tags, .. }
            | Self::ExecutionCancelled { tags, .. } => tags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTags {
    pub execution_id: ExecutionId,
    pub workflow_id: Option<String>,
    pub agent_id: Option<String>,
    pub correlation_id: String,
}

impl From<&crate::ExecutionContext> for EventTags {
    fn from(ctx: &crate::ExecutionContext) -> Self {
        Self {
            execution_id: ctx.execution_id,
            workflow_id: ctx.workflow_id.clone(),
            agent_id: ctx.agent_id.clone(),
            correlation_id: ctx.correlation_id.clone(),
        }
    }
}

/// Broadcast bus for execution events
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }
}
