//! Working defaults for every settings section.
//!
//! Chunking and index parameters follow the corpus the system was tuned on:
//! 512-token chunks with 50 overlap, HNSW with M=32 / efConstruction=200 /
//! efSearch=64.

use super::{
    ChunkingSettings, EmbeddingSettings, IndexSettings, LlmSettings, MemorySettings,
    RetrievalSettings,
};

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8090".to_string(),
            model_id: "bge-large-en-v1.5".to_string(),
            dimension: 1024,
            max_batch_size: 32,
            timeout_secs: 30,
        }
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            m: 32,
            ef_construction: 200,
            ef_search: 64,
        }
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            score_threshold: 0.3,
            filter_widen_factor: 3,
        }
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            max_turns: 10,
            prompt_window: 5,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8088".to_string(),
            primary_model: "exaone-4.0-1.2b".to_string(),
            fallback_model: "qwen2.5-1.5b-instruct".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}
