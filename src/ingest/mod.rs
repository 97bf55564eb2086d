//! Document ingestion: chunking, embedding and index population.

mod chunker;
mod document;

pub use chunker::Chunker;
pub use document::{Chunk, Document};

use std::sync::Arc;

use crate::core::config::EmbeddingSettings;
use crate::core::errors::RagError;
use crate::embedding::Embedder;
use crate::index::{EntryRecord, IndexEntry, VectorIndex};

/// Summary of a single document ingestion.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub document_id: String,
    pub chunks_indexed: usize,
}

/// Runs the document → chunks → embeddings → index pipeline.
pub struct IngestService {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    max_batch_size: usize,
}

impl IngestService {
    pub fn new(
        chunker: Chunker,
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        embedding: &EmbeddingSettings,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            max_batch_size: embedding.max_batch_size.max(1),
        }
    }

    /// Chunk, embed and insert a document.
    ///
    /// Embedding batches never exceed the configured cap; the index insert
    /// happens once at the end so concurrent readers see the document either
    /// absent or complete.
    pub async fn ingest(&self, document: &Document) -> Result<IngestReport, RagError> {
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            tracing::warn!("Document {} produced no chunks", document.id);
            return Ok(IngestReport {
                document_id: document.id.clone(),
                chunks_indexed: 0,
            });
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.max_batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;

            for (chunk, vector) in batch.iter().zip(vectors) {
                entries.push(IndexEntry {
                    record: EntryRecord {
                        chunk_id: chunk.id.clone(),
                        document_id: document.id.clone(),
                        text: chunk.text.clone(),
                        start_offset: chunk.start_offset,
                        end_offset: chunk.end_offset,
                        tags: document.tags.clone(),
                    },
                    vector,
                });
            }
        }

        let count = entries.len();
        self.index.insert(entries)?;

        tracing::info!(
            "Ingested document {} ({}): {} chunks",
            document.id,
            document.source_uri,
            count
        );

        Ok(IngestReport {
            document_id: document.id.clone(),
            chunks_indexed: count,
        })
    }
}
