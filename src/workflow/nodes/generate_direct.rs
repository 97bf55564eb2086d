// Generate-direct node
// Memory-only generation for small talk; no retrieval.

use async_trait::async_trait;

use crate::llm::{ChatMessage, GenerateRequest};
use crate::workflow::node::{Node, NodeContext, NodeOutput, WorkflowError};
use crate::workflow::prompt;
use crate::workflow::state::WorkflowState;

pub struct GenerateDirectNode;

impl GenerateDirectNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenerateDirectNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for GenerateDirectNode {
    fn id(&self) -> &'static str {
        "generate_direct"
    }

    fn name(&self) -> &'static str {
        "Direct Generation"
    }

    async fn execute(
        &self,
        state: &mut WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, WorkflowError> {
        let recent = ctx
            .memory
            .recent(&state.session_id, ctx.memory_settings.prompt_window);

        let mut messages = vec![ChatMessage::system(prompt::SYSTEM_PREAMBLE)];
        messages.extend(prompt::memory_messages(&recent));
        messages.push(ChatMessage::user(state.query.clone()));
        state.messages = messages.clone();

        let outcome = ctx
            .llm
            .generate(GenerateRequest::new(messages))
            .await
            .map_err(|e| WorkflowError::from_rag(self.id(), e))?;

        state.answer = Some(outcome.text);
        state.answered_by = Some(outcome.model_id);
        state.used_fallback = outcome.used_fallback;

        Ok(NodeOutput::Continue)
    }
}
