use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;
use crate::retrieval::ScoredChunk;

/// Outcome of query classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// Greeting or chit-chat; no domain retrieval needed.
    SmallTalk,
    /// A domain question that should be answered from the corpus.
    DomainQuestion,
}

/// Which branch the workflow took for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowPath {
    Retrieved,
    Direct,
}

impl WorkflowPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowPath::Retrieved => "retrieved",
            WorkflowPath::Direct => "direct",
        }
    }
}

/// Transient per-request state threaded through the workflow nodes.
/// Created at request start, dropped at request end; never persisted.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub session_id: String,
    pub query: String,
    pub top_k: usize,
    pub score_threshold: f32,
    pub tag_filter: Option<String>,

    pub intent: Option<QueryIntent>,
    pub path: Option<WorkflowPath>,
    pub retrieved: Vec<ScoredChunk>,
    pub messages: Vec<ChatMessage>,
    pub answer: Option<String>,
    pub answered_by: Option<String>,
    pub used_fallback: bool,
}

impl WorkflowState {
    pub fn new(
        session_id: impl Into<String>,
        query: impl Into<String>,
        top_k: usize,
        score_threshold: f32,
        tag_filter: Option<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            query: query.into(),
            top_k,
            score_threshold,
            tag_filter,
            intent: None,
            path: None,
            retrieved: Vec::new(),
            messages: Vec::new(),
            answer: None,
            answered_by: None,
            used_fallback: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_blank() {
        let state = WorkflowState::new("s1", "what is etching", 5, 0.3, None);
        assert_eq!(state.session_id, "s1");
        assert_eq!(state.query, "what is etching");
        assert!(state.intent.is_none());
        assert!(state.path.is_none());
        assert!(state.retrieved.is_empty());
        assert!(state.messages.is_empty());
        assert!(state.answer.is_none());
        assert!(!state.used_fallback);
    }

    #[test]
    fn path_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&WorkflowPath::Retrieved).unwrap(),
            "\"retrieved\""
        );
        assert_eq!(
            serde_json::to_string(&WorkflowPath::Direct).unwrap(),
            "\"direct\""
        );
        assert_eq!(WorkflowPath::Retrieved.as_str(), "retrieved");
    }
}
