//! Typed facade for the external API layer.
//!
//! One `answer` call runs one workflow instance; concurrent calls are
//! independent except for the shared index (read-mostly) and the
//! per-session memory buffers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::config::{validation, Settings};
use crate::core::errors::RagError;
use crate::embedding::Embedder;
use crate::index::VectorIndex;
use crate::llm::{LlmProvider, LlmService};
use crate::memory::ConversationMemory;
use crate::retrieval::{Retriever, ScoredChunk};
use crate::workflow::{
    build_agent_workflow, prompt, NodeContext, WorkflowPath, WorkflowRuntime, WorkflowState,
};

/// Inbound query contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub session_id: String,
    pub question: String,
    /// Optional per-request override of the configured top_k.
    #[serde(default)]
    pub top_k: Option<usize>,
    /// Optional per-request override of the configured score threshold.
    #[serde(default)]
    pub score_threshold: Option<f32>,
    /// Optional domain-tag filter.
    #[serde(default)]
    pub tag_filter: Option<String>,
}

/// Outbound answer contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    /// Source chunks used for the answer; empty on the direct path.
    pub sources: Vec<ScoredChunk>,
    pub path: WorkflowPath,
    /// True when this is the apologetic degraded answer after all retries
    /// were exhausted. Memory is left untouched in that case.
    pub degraded: bool,
}

pub struct AgentService {
    settings: Settings,
    retriever: Retriever,
    memory: ConversationMemory,
    llm: LlmService,
    runtime: WorkflowRuntime,
}

impl AgentService {
    /// Validates settings up front; invalid configuration never reaches
    /// the pipeline.
    pub fn new(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Self, RagError> {
        validation::validate(&settings)?;

        if embedder.dimension() != index.dimension() {
            return Err(RagError::IndexCompatibility(format!(
                "embedder dimension {} does not match index dimension {}",
                embedder.dimension(),
                index.dimension()
            )));
        }
        if embedder.model_id() != index.model_id() {
            return Err(RagError::IndexCompatibility(format!(
                "embedder model '{}' does not match index model '{}'",
                embedder.model_id(),
                index.model_id()
            )));
        }

        let retriever = Retriever::new(embedder, index, settings.retrieval.clone());
        let memory = ConversationMemory::new(settings.memory.max_turns);
        let llm = LlmService::new(provider, settings.llm.clone());
        let runtime =
            build_agent_workflow().map_err(|e| RagError::Internal(e.to_string()))?;

        Ok(Self {
            settings,
            retriever,
            memory,
            llm,
            runtime,
        })
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Answer one query.
    ///
    /// Request-parameter problems are the only errors the caller sees;
    /// runtime faults inside the workflow come back as a degraded
    /// `QueryResponse` instead of an `Err`.
    pub async fn answer(&self, request: QueryRequest) -> Result<QueryResponse, RagError> {
        let top_k = request.top_k.unwrap_or(self.settings.retrieval.top_k);
        if top_k == 0 {
            return Err(RagError::Configuration(
                "top_k override must be at least 1".to_string(),
            ));
        }
        let score_threshold = request
            .score_threshold
            .unwrap_or(self.settings.retrieval.score_threshold);
        if !(-1.0..=1.0).contains(&score_threshold) {
            return Err(RagError::Configuration(format!(
                "score_threshold override ({}) must be within [-1, 1]",
                score_threshold
            )));
        }
        if request.session_id.is_empty() {
            return Err(RagError::Configuration(
                "session_id must not be empty".to_string(),
            ));
        }

        let mut state = WorkflowState::new(
            &request.session_id,
            &request.question,
            top_k,
            score_threshold,
            request.tag_filter.clone(),
        );

        let ctx = NodeContext {
            retriever: &self.retriever,
            memory: &self.memory,
            llm: &self.llm,
            memory_settings: &self.settings.memory,
        };

        match self.runtime.run(&mut state, &ctx).await {
            Ok(()) => {
                let path = state.path.unwrap_or(WorkflowPath::Retrieved);
                let sources = match path {
                    WorkflowPath::Retrieved => state.retrieved,
                    WorkflowPath::Direct => Vec::new(),
                };
                Ok(QueryResponse {
                    answer: state.answer.unwrap_or_default(),
                    sources,
                    path,
                    degraded: false,
                })
            }
            Err(err) => {
                tracing::error!(
                    "Workflow failed for session {}: {}",
                    request.session_id,
                    err
                );
                Ok(QueryResponse {
                    answer: prompt::DEGRADED_ANSWER.to_string(),
                    sources: Vec::new(),
                    path: state.path.unwrap_or(WorkflowPath::Retrieved),
                    degraded: true,
                })
            }
        }
    }

    /// Explicit clear-session operation for the external API layer.
    pub fn clear_session(&self, session_id: &str) {
        self.memory.clear(session_id);
        tracing::info!("Cleared conversation memory for session {}", session_id);
    }
}
