// Retrieve-and-generate node
// Retrieval, prompt assembly and generation for domain questions.

use async_trait::async_trait;

use crate::llm::{ChatMessage, GenerateRequest};
use crate::workflow::node::{Node, NodeContext, NodeOutput, WorkflowError};
use crate::workflow::prompt;
use crate::workflow::state::WorkflowState;

pub struct RetrieveGenerateNode;

impl RetrieveGenerateNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RetrieveGenerateNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RetrieveGenerateNode {
    fn id(&self) -> &'static str {
        "retrieve_generate"
    }

    fn name(&self) -> &'static str {
        "Retrieve & Generate"
    }

    async fn execute(
        &self,
        state: &mut WorkflowState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, WorkflowError> {
        let chunks = ctx
            .retriever
            .retrieve(
                &state.query,
                state.top_k,
                state.score_threshold,
                state.tag_filter.as_deref(),
            )
            .await
            .map_err(|e| WorkflowError::from_rag(self.id(), e))?;

        // Empty retrieval is "no relevant context", not a fault.
        state.retrieved = prompt::dedup_chunks(chunks);
        if state.retrieved.is_empty() {
            tracing::info!("No chunks above threshold; generating without context");
        }

        let context = prompt::format_context(&state.retrieved);
        let recent = ctx
            .memory
            .recent(&state.session_id, ctx.memory_settings.prompt_window);

        let mut messages = vec![ChatMessage::system(prompt::SYSTEM_PREAMBLE)];
        messages.extend(prompt::memory_messages(&recent));
        messages.push(ChatMessage::user(prompt::question_with_context(
            &state.query,
            &context,
        )));
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
