//! Query-time retrieval: embed the query, search the index, filter by
//! score threshold.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::RetrievalSettings;
use crate::core::errors::RagError;
use crate::embedding::Embedder;
use crate::index::VectorIndex;

/// A retrieved chunk with its relevance score, most relevant first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub text: String,
    pub tags: Vec<String>,
    pub score: f32,
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    settings: RetrievalSettings,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            settings,
        }
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Retrieve the chunks most relevant to `query`.
    ///
    /// Embedder failures are retried once with jittered backoff, then
    /// surface as `Retrieval`. Zero surviving results is an empty Vec
    /// ("no relevant context"), not a fault. Structural index errors
    /// propagate unchanged.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f32,
        tag_filter: Option<&str>,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let query_vector = self.embed_with_retry(query).await?;

        // Widen the search when a tag filter will discard candidates.
        let search_k = if tag_filter.is_some() {
            top_k * self.settings.filter_widen_factor
        } else {
            top_k
        };

        let hits = match self.index.search(&query_vector, search_k, score_threshold) {
            Ok(hits) => hits,
            Err(err) if err.is_structural() => return Err(err),
            Err(err) => return Err(RagError::Retrieval(err.to_string())),
        };

        let mut results: Vec<ScoredChunk> = hits
            .into_iter()
            .filter(|hit| match tag_filter {
                Some(tag) => hit.record.tags.iter().any(|t| t == tag),
                None => true,
            })
            .map(|hit| ScoredChunk {
                chunk_id: hit.record.chunk_id,
                document_id: hit.record.document_id,
                text: hit.record.text,
                tags: hit.record.tags,
                score: hit.score,
            })
            .collect();
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks for query ({} requested, threshold {})",
            results.len(),
            top_k,
            score_threshold
        );
        Ok(results)
    }

    async fn embed_with_retry(&self, query: &str) -> Result<Vec<f32>, RagError> {
        let input = vec![query.to_string()];

        let first = match self.embedder.embed(&input).await {
            Ok(mut vectors) if !vectors.is_empty() => return Ok(vectors.remove(0)),
            Ok(_) => RagError::Embedding("embedder returned no vector for query".to_string()),
            Err(err) => err,
        };

        tracing::warn!("Query embedding failed, retrying once: {}", first);
        let jitter_ms = rand::rng().random_range(0..250);
        tokio::time::sleep(Duration::from_millis(250 + jitter_ms)).await;

        match self.embedder.embed(&input).await {
            Ok(mut vectors) if !vectors.is_empty() => Ok(vectors.remove(0)),
            Ok(_) => Err(RagError::Retrieval(
                "embedder returned no vector for query".to_string(),
            )),
            Err(err) => Err(RagError::Retrieval(format!(
                "query embedding failed after retry: {}",
                err
            ))),
        }
    }
}
