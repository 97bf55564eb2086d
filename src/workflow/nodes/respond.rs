// Respond node
// Commits the exchange to memory and finishes the workflow.
// The only writer of conversation memory: requests that fail earlier
// leave memory exactly as it was.

use async_trait::async_trait;

use crate::memory::Turn;
use crate::workflow::node::{Node, NodeContext, NodeOutput, WorkflowError};
use crate::workflow::state::WorkflowState;

pub struct RespondNode;

impl RespondNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RespondNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RespondNode {
    fn id(&self) -> &'static str {
        "respond"
    }

    fn name(&self) -> &'static str {
        "Respond"
    }

    async fn execute(
        &self,
        state: &mut WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, WorkflowError> {
        let answer = state
            .answer
            .clone()
            .ok_or_else(|| WorkflowError::new(self.id(), "no answer was generated"))?;

        ctx.memory.append_exchange(
            &state.session_id,
            Turn::user(&state.query),
            Turn::assistant(&answer),
        );

        tracing::info!(
            "Workflow complete for session {} via {} path ({} source chunks)",
            state.session_id,
            state.path.map(|p| p.as_str()).unwrap_or("unknown"),
            state.retrieved.len()
        );
        Ok(NodeOutput::Final)
    }
}
