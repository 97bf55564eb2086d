pub mod http;
pub mod provider;
pub mod service;
pub mod types;

pub use http::OpenAiChatProvider;
pub use provider::LlmProvider;
pub use service::{GenerationOutcome, LlmService};
pub use types::{ChatMessage, GenerateRequest};
