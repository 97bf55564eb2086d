use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A source document as handed over by the (external) acquisition layer.
///
/// Immutable once created; re-ingesting a source produces a new document
/// with a new id rather than mutating an existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source_uri: String,
    pub raw_text: String,
    /// Domain tags (e.g. "VirtualFab", "FabScheduling") used for retrieval filtering.
    pub tags: Vec<String>,
    pub ingested_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        source_uri: impl Into<String>,
        raw_text: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_uri: source_uri.into(),
            raw_text: raw_text.into(),
            tags,
            ingested_at: Utc::now(),
        }
    }
}

/// A bounded fragment of a document, the unit that gets embedded and indexed.
///
/// Offsets are byte offsets into `Document::raw_text`, always on UTF-8
/// character boundaries, with `start_offset < end_offset <= raw_text.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    /// Whitespace-token approximation, used for prompt budgeting.
    pub token_count: usize,
}
