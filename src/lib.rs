//! Retrieval-augmented question answering core for the semiconductor
//! fabrication domain: chunking, embedding, ANN indexing, retrieval,
//! conversation memory and the agent workflow that sequences them.
//!
//! The HTTP layer, UI, crawling and model backends are external
//! collaborators; they talk to this crate through [`AgentService`] and the
//! [`embedding::Embedder`] / [`llm::LlmProvider`] capability traits.

pub mod core;
pub mod embedding;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod memory;
pub mod retrieval;
pub mod service;
pub mod workflow;

pub use crate::core::config::Settings;
pub use crate::core::errors::RagError;
pub use crate::index::VectorIndex;
pub use crate::ingest::{Chunker, Document, IngestService};
pub use crate::memory::ConversationMemory;
pub use crate::retrieval::Retriever;
pub use crate::service::{AgentService, QueryRequest, QueryResponse};
