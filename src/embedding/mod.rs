//! Embedding capability interface.
//!
//! The backing model is an external collaborator; this module only defines
//! the contract (order-preserving, all-or-nothing batches) and an HTTP
//! client for OpenAI-compatible embedding servers.

mod http;

pub use http::HttpEmbedder;

use async_trait::async_trait;

use crate::core::errors::RagError;

/// Maps texts to fixed-dimension dense vectors.
///
/// Implementations guarantee the output has the same length and order as
/// the input, and fail the whole batch on any backend error; callers never
/// see partial results.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the backing model. Vectors from different models are
    /// never mixed in one index.
    fn model_id(&self) -> &str;

    /// Dimension of every vector this embedder produces.
    fn dimension(&self) -> usize;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}
