pub mod defaults;
pub mod service;
pub mod validation;

use serde::{Deserialize, Serialize};

pub use service::ConfigService;

/// Top-level settings tree for the pipeline.
///
/// Every section has a working default; a TOML file overlays individual
/// fields. `validation::validate` must pass before any component is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub retrieval: RetrievalSettings,
    pub memory: MemorySettings,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Chunk size in whitespace tokens.
    pub chunk_size: usize,
    /// Tokens re-included from the tail of each chunk at the head of the next.
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// OpenAI-compatible endpoint serving /v1/embeddings.
    pub endpoint: String,
    pub model_id: String,
    pub dimension: usize,
    /// Maximum texts per embed call; larger batches are split by the caller.
    pub max_batch_size: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Max neighbors per node per layer.
    pub m: usize,
    /// Beam width during construction.
    pub ef_construction: usize,
    /// Beam width during search.
    pub ef_search: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    /// Minimum cosine similarity for a chunk to count as relevant.
    pub score_threshold: f32,
    /// Search breadth multiplier when a domain-tag filter is active.
    pub filter_widen_factor: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Turns kept per session before FIFO eviction.
    pub max_turns: usize,
    /// Most recent turns included when assembling a prompt.
    pub prompt_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible endpoint serving /v1/chat/completions.
    pub endpoint: String,
    pub primary_model: String,
    pub fallback_model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Per-attempt timeout; a timed-out primary is retried once, then the
    /// fallback model gets a single attempt.
    pub timeout_secs: u64,
}
