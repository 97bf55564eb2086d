use async_trait::async_trait;

use crate::core::config::MemorySettings;
use crate::core::errors::RagError;
use crate::llm::LlmService;
use crate::memory::ConversationMemory;
use crate::retrieval::Retriever;

use super::state::WorkflowState;

/// Handles a node needs during execution; borrowed from the service for
/// the duration of one request.
pub struct NodeContext<'a> {
    pub retriever: &'a Retriever,
    pub memory: &'a ConversationMemory,
    pub llm: &'a LlmService,
    pub memory_settings: &'a MemorySettings,
}

/// Output of a node execution.
#[derive(Debug, Clone)]
pub enum NodeOutput {
    /// Follow the default edge.
    Continue,
    /// Follow the conditional edge matching this label.
    Branch(String),
    /// Workflow complete.
    Final,
}

/// Workflow execution error, carrying the node that failed and the node
/// ids visited before it (most recent last).
#[derive(Debug, Clone)]
pub struct WorkflowError {
    pub node_id: String,
    pub message: String,
    pub execution_trace: Vec<String>,
}

impl WorkflowError {
    pub fn new(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
            execution_trace: Vec::new(),
        }
    }

    pub fn from_rag(node_id: impl Into<String>, err: RagError) -> Self {
        Self::new(node_id, err.to_string())
    }

    /// Appended by the runtime as it unwinds after a failure.
    pub fn with_trace_entry(mut self, node_id: impl Into<String>) -> Self {
        self.execution_trace.push(node_id.into());
        self
    }
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "workflow error in {}: {}", self.node_id, self.message)
        } else {
            write!(
                f,
                "workflow error in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.message
            )
        }
    }
}

impl std::error::Error for WorkflowError {}

/// All workflow nodes implement this.
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node.
    fn id(&self) -> &'static str;

    /// Human-readable name for display.
    fn name(&self) -> &'static str {
        self.id()
    }

    async fn execute(
        &self,
        state: &mut WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, WorkflowError>;
}
