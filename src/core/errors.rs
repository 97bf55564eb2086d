use thiserror::Error;

/// Error taxonomy for the retrieval/generation core.
///
/// `Configuration` is rejected before any pipeline execution; the structural
/// variants (`DimensionMismatch`, `IndexCompatibility`) are fatal to the
/// operation and leave the index unmodified; the remaining variants are
/// caught at the workflow boundary and turned into a degraded answer.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("incompatible index: {0}")]
    IndexCompatibility(String),
    #[error("llm provider error: {0}")]
    LlmProvider(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RagError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        RagError::Internal(err.to_string())
    }

    /// Errors that require operator intervention rather than a retry.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            RagError::DimensionMismatch { .. } | RagError::IndexCompatibility(_)
        )
    }
}
