use async_trait::async_trait;

use crate::core::errors::RagError;

use super::types::GenerateRequest;

/// Capability interface to a generative model backend.
///
/// Implementations are blocking calls from the workflow's point of view;
/// timeout and fallback policy live in `LlmService`, not here.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "openai-compat").
    fn name(&self) -> &str;

    /// Chat completion, non-streaming.
    async fn generate(&self, request: GenerateRequest, model_id: &str)
        -> Result<String, RagError>;
}
