// Classify node
// Decides whether a query needs domain retrieval.

use async_trait::async_trait;

use crate::workflow::node::{Node, NodeContext, NodeOutput, WorkflowError};
use crate::workflow::state::{QueryIntent, WorkflowPath, WorkflowState};

pub struct ClassifyNode;

impl ClassifyNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClassifyNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for ClassifyNode {
    fn id(&self) -> &'static str {
        "classify"
    }

    fn name(&self) -> &'static str {
        "Intent Classifier"
    }

    async fn execute(
        &self,
        state: &mut WorkflowState,
        _ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, WorkflowError> {
        let intent = classify_intent(&state.query);
        state.intent = Some(intent);

        let route = match intent {
            QueryIntent::SmallTalk => {
                state.path = Some(WorkflowPath::Direct);
                "direct"
            }
            QueryIntent::DomainQuestion => {
                state.path = Some(WorkflowPath::Retrieved);
                "retrieve"
            }
        };

        tracing::info!("Classified query as {:?}, routing to {}", intent, route);
        Ok(NodeOutput::Branch(route.to_string()))
    }
}

/// Keyword heuristic for greetings and chit-chat. Anything ambiguous is a
/// domain question: the retrieval path is the safer default (more context,
/// never less).
fn classify_intent(query: &str) -> QueryIntent {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return QueryIntent::DomainQuestion;
    }

    // Long queries are never small talk.
    if trimmed.split_whitespace().count() > 8 {
        return QueryIntent::DomainQuestion;
    }

    let lowered = trimmed.to_lowercase();
    let greetings = [
        "hello",
        "hi",
        "hey",
        "good morning",
        "good afternoon",
        "good evening",
        "how are you",
        "thanks",
        "thank you",
        "bye",
        "goodbye",
        "who are you",
        "안녕",
        "고마워",
        "감사합니다",
    ];

    let is_greeting = greetings.iter().any(|kw| {
        lowered == *kw
            || lowered.starts_with(&format!("{} ", kw))
            || lowered.starts_with(&format!("{}!", kw))
            || lowered.starts_with(&format!("{},", kw))
            || lowered.starts_with(&format!("{}.", kw))
    });

    if is_greeting {
        QueryIntent::SmallTalk
    } else {
        QueryIntent::DomainQuestion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greetings_are_small_talk() {
        assert_eq!(classify_intent("hello"), QueryIntent::SmallTalk);
        assert_eq!(classify_intent("Hi there!"), QueryIntent::SmallTalk);
        assert_eq!(classify_intent("thank you"), QueryIntent::SmallTalk);
        assert_eq!(classify_intent("안녕하세요"), QueryIntent::SmallTalk);
    }

    #[test]
    fn domain_questions_go_to_retrieval() {
        assert_eq!(
            classify_intent("what is etching"),
            QueryIntent::DomainQuestion
        );
        assert_eq!(
            classify_intent("explain virtual metrology for CMP"),
            QueryIntent::DomainQuestion
        );
    }

    #[test]
    fn ambiguous_input_defaults_to_retrieval() {
        assert_eq!(classify_intent(""), QueryIntent::DomainQuestion);
        assert_eq!(classify_intent("   "), QueryIntent::DomainQuestion);
        assert_eq!(classify_intent("etch?"), QueryIntent::DomainQuestion);
    }

    #[test]
    fn greeting_embedded_in_long_question_is_domain() {
        assert_eq!(
            classify_intent("hi, can you explain how plasma etching selectivity is controlled in production"),
            QueryIntent::DomainQuestion
        );
    }
}
