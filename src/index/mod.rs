//! Approximate nearest-neighbor index over chunk embeddings.
//!
//! A shared, read-mostly resource: searches run concurrently under a read
//! lock; inserts, rebuilds and persistence take the write lock so readers
//! never observe a partially-written graph.

mod hnsw;
mod persistence;

use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::core::config::IndexSettings;
use crate::core::errors::RagError;

use hnsw::HnswGraph;

/// Everything needed to reconstruct a retrieval result without a secondary
/// lookup. Persisted in the sidecar metadata file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord {
    pub chunk_id: String,
    pub document_id: String,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub tags: Vec<String>,
}

/// Insert payload: record plus its embedding vector.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub record: EntryRecord,
    pub vector: Vec<f32>,
}

/// One search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub record: EntryRecord,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub entries: usize,
    pub dimension: usize,
    pub model_id: String,
    pub generation: u64,
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
}

#[derive(Debug)]
pub struct VectorIndex {
    dimension: usize,
    model_id: String,
    inner: RwLock<IndexInner>,
}

#[derive(Debug)]
struct IndexInner {
    graph: HnswGraph,
    records: Vec<EntryRecord>,
    settings: IndexSettings,
    /// Bumped on every rebuild; incremental inserts never improve recall
    /// for earlier points, so readers can compare generations to decide
    /// whether maintenance has happened.
    generation: u64,
}

impl VectorIndex {
    pub fn new(dimension: usize, model_id: impl Into<String>, settings: IndexSettings) -> Self {
        let graph = HnswGraph::new(settings.m, settings.ef_construction);
        Self {
            dimension,
            model_id: model_id.into(),
            inner: RwLock::new(IndexInner {
                graph,
                records: Vec::new(),
                settings,
                generation: 0,
            }),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("index lock poisoned").records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().expect("index lock poisoned").generation
    }

    pub fn stats(&self) -> IndexStats {
        let inner = self.inner.read().expect("index lock poisoned");
        IndexStats {
            entries: inner.records.len(),
            dimension: self.dimension,
            model_id: self.model_id.clone(),
            generation: inner.generation,
            m: inner.settings.m,
            ef_construction: inner.settings.ef_construction,
            ef_search: inner.settings.ef_search,
        }
    }

    /// Append entries, assigning ordinals in insertion order.
    ///
    /// Atomic per call: every vector is validated before the graph is
    /// touched, so a dimension mismatch leaves the index unmodified.
    pub fn insert(&self, entries: Vec<IndexEntry>) -> Result<(), RagError> {
        for entry in &entries {
            if entry.vector.len() != self.dimension {
                return Err(RagError::DimensionMismatch {
                    expected: self.dimension,
                    got: entry.vector.len(),
                });
            }
        }

        if entries.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write().expect("index lock poisoned");
        for entry in entries {
            inner.graph.add_point(entry.vector);
            inner.records.push(entry.record);
        }
        tracing::debug!("Index now holds {} entries", inner.records.len());
        Ok(())
    }

    /// Top-k entries by cosine similarity, scores descending, ties broken
    /// by insertion order. Entries below `score_threshold` are dropped; an
    /// empty index yields an empty result, not an error.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<SearchHit>, RagError> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }

        let inner = self.inner.read().expect("index lock poisoned");
        if inner.records.is_empty() {
            return Ok(Vec::new());
        }

        let hits = inner.graph.search(query, k, inner.settings.ef_search);
        Ok(hits
            .into_iter()
            .filter(|&(_, score)| score >= score_threshold)
            .map(|(ordinal, score)| SearchHit {
                record: inner.records[ordinal as usize].clone(),
                score,
            })
            .collect())
    }

    /// Rebuild the graph under new construction parameters and bump the
    /// generation. This is the documented maintenance operation: recall
    /// improvements from parameter changes only apply after a rebuild.
    pub fn rebuild(&self, settings: IndexSettings) -> Result<(), RagError> {
        let mut inner = self.inner.write().expect("index lock poisoned");

        let mut graph = HnswGraph::new(settings.m, settings.ef_construction);
        for ordinal in 0..inner.records.len() {
            let vector = inner.graph.vector(ordinal as u32).to_vec();
            graph.add_point(vector);
        }

        inner.graph = graph;
        inner.settings = settings;
        inner.generation += 1;
        tracing::info!(
            "Rebuilt index: {} entries, generation {}",
            inner.records.len(),
            inner.generation
        );
        Ok(())
    }

    /// Write the graph file and its sidecar metadata file.
    pub fn persist(&self, path: &Path) -> Result<(), RagError> {
        let inner = self.inner.read().expect("index lock poisoned");
        persistence::persist(&inner, self.dimension, &self.model_id, path)
    }

    /// Load a graph file plus sidecar, verifying both against each other
    /// and against the expected embedding dimension and model.
    pub fn load(
        path: &Path,
        expected_dimension: usize,
        expected_model: &str,
    ) -> Result<Self, RagError> {
        persistence::load(path, expected_dimension, expected_model)
    }

    fn from_loaded(
        dimension: usize,
        model_id: String,
        graph: HnswGraph,
        records: Vec<EntryRecord>,
        settings: IndexSettings,
        generation: u64,
    ) -> Self {
        Self {
            dimension,
            model_id,
            inner: RwLock::new(IndexInner {
                graph,
                records,
                settings,
                generation,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(chunk_id: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            record: EntryRecord {
                chunk_id: chunk_id.to_string(),
                document_id: "doc-1".to_string(),
                text: format!("text for {}", chunk_id),
                start_offset: 0,
                end_offset: 10,
                tags: vec!["VirtualFab".to_string()],
            },
            vector,
        }
    }

    fn index(dim: usize) -> VectorIndex {
        VectorIndex::new(dim, "bge-large-en-v1.5", IndexSettings::default())
    }

    #[test]
    fn search_on_empty_index_returns_empty() {
        let idx = index(3);
        let hits = idx.search(&[1.0, 0.0, 0.0], 5, 0.0).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn wrong_dimension_insert_is_atomic() {
        let idx = index(3);
        idx.insert(vec![entry("c1", vec![1.0, 0.0, 0.0])]).unwrap();
        assert_eq!(idx.len(), 1);

        let err = idx
            .insert(vec![
                entry("c2", vec![0.0, 1.0, 0.0]),
                entry("c3", vec![0.0, 1.0]),
            ])
            .unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 3,
                got: 2
            }
        ));
        // Nothing from the failed batch landed.
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn wrong_dimension_query_is_rejected() {
        let idx = index(3);
        idx.insert(vec![entry("c1", vec![1.0, 0.0, 0.0])]).unwrap();
        assert!(matches!(
            idx.search(&[1.0, 0.0], 5, 0.0),
            Err(RagError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn threshold_filters_low_scores() {
        let idx = index(2);
        idx.insert(vec![
            entry("close", vec![1.0, 0.05]),
            entry("far", vec![0.0, 1.0]),
        ])
        .unwrap();

        let hits = idx.search(&[1.0, 0.0], 5, 0.5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.chunk_id, "close");
        for hit in &hits {
            assert!(hit.score >= 0.5);
        }
    }

    #[test]
    fn ties_resolve_to_earlier_insertion() {
        let idx = index(2);
        idx.insert(vec![
            entry("first", vec![1.0, 0.0]),
            entry("second", vec![1.0, 0.0]),
        ])
        .unwrap();

        let hits = idx.search(&[1.0, 0.0], 2, 0.0).unwrap();
        assert_eq!(hits[0].record.chunk_id, "first");
        assert_eq!(hits[1].record.chunk_id, "second");
    }

    #[test]
    fn rebuild_bumps_generation_and_preserves_results() {
        let idx = index(2);
        idx.insert(vec![
            entry("a", vec![1.0, 0.0]),
            entry("b", vec![0.0, 1.0]),
        ])
        .unwrap();
        assert_eq!(idx.generation(), 0);

        let before = idx.search(&[0.9, 0.1], 2, -1.0).unwrap();

        let mut settings = IndexSettings::default();
        settings.ef_construction = 300;
        idx.rebuild(settings).unwrap();

        assert_eq!(idx.generation(), 1);
        let after = idx.search(&[0.9, 0.1], 2, -1.0).unwrap();
        assert_eq!(before.len(), after.len());
        assert_eq!(before[0].record.chunk_id, after[0].record.chunk_id);
    }

    #[test]
    fn stats_report_parameters() {
        let idx = index(4);
        let stats = idx.stats();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.dimension, 4);
        assert_eq!(stats.m, 32);
        assert_eq!(stats.ef_construction, 200);
        assert_eq!(stats.generation, 0);
    }

    #[test]
    fn returns_fewer_than_k_when_index_is_small() {
        let idx = index(2);
        idx.insert(vec![entry("only", vec![1.0, 0.0])]).unwrap();
        let hits = idx.search(&[1.0, 0.0], 10, -1.0).unwrap();
        assert_eq!(hits.len(), 1);
    }
}
