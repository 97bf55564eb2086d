//! Prompt assembly: system preamble, recent memory turns, cited context.

use crate::llm::ChatMessage;
use crate::memory::Turn;
use crate::retrieval::ScoredChunk;

/// System role for the generative model.
pub const SYSTEM_PREAMBLE: &str = "You are an expert assistant for semiconductor \
manufacturing, Virtual Fab, Digital Twin and Virtual Metrology. Answer precisely \
and professionally, grounding your answers in the provided documents when they \
are available. If the documents do not cover the question, say so instead of \
guessing.";

/// Fixed answer for the degraded terminal; never exposes internals.
pub const DEGRADED_ANSWER: &str = "I'm sorry, I couldn't generate an answer for \
that question right now. Please try again in a moment.";

/// Drop duplicate chunks, keeping the first (most relevant) occurrence.
pub fn dedup_chunks(chunks: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
    let mut seen = std::collections::HashSet::new();
    chunks
        .into_iter()
        .filter(|chunk| seen.insert(chunk.chunk_id.clone()))
        .collect()
}

/// Numbered context blocks with source and relevance, most relevant first.
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    let mut context = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        context.push_str(&format!(
            "[{}] (Source: {}, relevance: {:.2})\n{}\n\n",
            i + 1,
            chunk.document_id,
            chunk.score,
            chunk.text
        ));
    }
    context.trim_end().to_string()
}

/// Conversation turns as chat messages, oldest first.
pub fn memory_messages(turns: &[Turn]) -> Vec<ChatMessage> {
    turns
        .iter()
        .map(|turn| ChatMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        })
        .collect()
}

/// The user message for the retrieval path.
pub fn question_with_context(question: &str, context: &str) -> String {
    if context.is_empty() {
        return question.to_string();
    }
    format!(
        "Here is related document material:\n\n{}\n\nQuestion: {}\n\nAnswer based on the material above.",
        context, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk_id: id.to_string(),
            document_id: "doc-1".to_string(),
            text: text.to_string(),
            tags: Vec::new(),
            score,
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let chunks = vec![
            chunk("a", "first", 0.9),
            chunk("b", "second", 0.8),
            chunk("a", "duplicate of first", 0.7),
        ];
        let deduped = dedup_chunks(chunks);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].chunk_id, "a");
        assert_eq!(deduped[0].text, "first");
        assert_eq!(deduped[1].chunk_id, "b");
    }

    #[test]
    fn context_is_numbered_and_cited() {
        let context = format_context(&[
            chunk("a", "Etching removes material.", 0.92),
            chunk("b", "Lithography patterns resist.", 0.81),
        ]);

        assert!(context.starts_with("[1] (Source: doc-1, relevance: 0.92)"));
        assert!(context.contains("[2] (Source: doc-1, relevance: 0.81)"));
        assert!(context.contains("Etching removes material."));
    }

    #[test]
    fn empty_context_passes_question_through() {
        assert_eq!(question_with_context("what is etching", ""), "what is etching");
        let with = question_with_context("what is etching", "[1] stuff");
        assert!(with.contains("what is etching"));
        assert!(with.contains("[1] stuff"));
    }

    #[test]
    fn memory_turns_become_chat_messages() {
        use crate::memory::Turn;
        let turns = vec![Turn::user("hi"), Turn::assistant("hello")];
        let messages = memory_messages(&turns);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
    }
}
