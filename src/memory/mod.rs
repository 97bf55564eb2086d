//! Session-scoped conversation memory.
//!
//! An owned, session-keyed store handed into each workflow invocation.
//! Each session holds a bounded FIFO buffer of turns; sessions never share
//! state, and operations on the same session serialize on that session's
//! buffer lock to preserve turn ordering.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

type SessionBuffer = Arc<Mutex<VecDeque<Turn>>>;

pub struct ConversationMemory {
    capacity: usize,
    sessions: RwLock<HashMap<String, SessionBuffer>>,
}

impl ConversationMemory {
    /// `capacity` is the maximum turn count per session; appending beyond
    /// it evicts the oldest turn first.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a turn, creating the session on first use.
    pub fn append(&self, session_id: &str, turn: Turn) {
        let buffer = self.session_buffer(session_id);
        let mut turns = buffer.lock().expect("session lock poisoned");
        turns.push_back(turn);
        while turns.len() > self.capacity {
            turns.pop_front();
        }
    }

    /// Append a question/answer pair under a single session lock, so
    /// concurrent requests on the same session cannot interleave inside
    /// an exchange.
    pub fn append_exchange(&self, session_id: &str, question: Turn, answer: Turn) {
        let buffer = self.session_buffer(session_id);
        let mut turns = buffer.lock().expect("session lock poisoned");
        turns.push_back(question);
        turns.push_back(answer);
        while turns.len() > self.capacity {
            turns.pop_front();
        }
    }

    /// All turns of a session, oldest first.
    pub fn get(&self, session_id: &str) -> Vec<Turn> {
        match self.existing_buffer(session_id) {
            Some(buffer) => {
                let turns = buffer.lock().expect("session lock poisoned");
                turns.iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// The most recent `n` turns of a session, oldest of those first.
    pub fn recent(&self, session_id: &str, n: usize) -> Vec<Turn> {
        match self.existing_buffer(session_id) {
            Some(buffer) => {
                let turns = buffer.lock().expect("session lock poisoned");
                let skip = turns.len().saturating_sub(n);
                turns.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    pub fn turn_count(&self, session_id: &str) -> usize {
        self.existing_buffer(session_id)
            .map(|buffer| buffer.lock().expect("session lock poisoned").len())
            .unwrap_or(0)
    }

    /// Remove all turns but keep the session entry itself.
    pub fn clear(&self, session_id: &str) {
        if let Some(buffer) = self.existing_buffer(session_id) {
            buffer.lock().expect("session lock poisoned").clear();
        }
    }

    fn existing_buffer(&self, session_id: &str) -> Option<SessionBuffer> {
        self.sessions
            .read()
            .expect("memory lock poisoned")
            .get(session_id)
            .cloned()
    }

    fn session_buffer(&self, session_id: &str) -> SessionBuffer {
        if let Some(buffer) = self.existing_buffer(session_id) {
            return buffer;
        }
        let mut sessions = self.sessions.write().expect("memory lock poisoned");
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::new())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_eviction_at_capacity() {
        let memory = ConversationMemory::new(2);
        memory.append("s", Turn::user("t1"));
        memory.append("s", Turn::assistant("t2"));
        memory.append("s", Turn::user("t3"));

        let turns = memory.get("s");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "t2");
        assert_eq!(turns[1].content, "t3");
    }

    #[test]
    fn never_exceeds_capacity() {
        let memory = ConversationMemory::new(4);
        for i in 0..50 {
            memory.append("s", Turn::user(format!("turn {}", i)));
            assert!(memory.turn_count("s") <= 4);
        }
        let turns = memory.get("s");
        assert_eq!(turns[0].content, "turn 46");
        assert_eq!(turns[3].content, "turn 49");
    }

    #[test]
    fn exchange_append_is_atomic_and_evicts_fifo() {
        let memory = ConversationMemory::new(3);
        memory.append_exchange("s", Turn::user("q1"), Turn::assistant("a1"));
        memory.append_exchange("s", Turn::user("q2"), Turn::assistant("a2"));

        let turns = memory.get("s");
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].content, "a1");
        assert_eq!(turns[1].content, "q2");
        assert_eq!(turns[2].content, "a2");
    }

    #[test]
    fn sessions_are_independent() {
        let memory = ConversationMemory::new(10);
        memory.append("a", Turn::user("from a"));
        memory.append("b", Turn::user("from b"));

        assert_eq!(memory.get("a").len(), 1);
        assert_eq!(memory.get("b").len(), 1);
        assert_eq!(memory.get("a")[0].content, "from a");
    }

    #[test]
    fn clear_empties_but_session_survives() {
        let memory = ConversationMemory::new(10);
        memory.append("s", Turn::user("hello"));
        memory.clear("s");

        assert_eq!(memory.turn_count("s"), 0);
        // The session identity is still there; appending works as before.
        memory.append("s", Turn::user("again"));
        assert_eq!(memory.turn_count("s"), 1);
    }

    #[test]
    fn clear_of_unknown_session_is_a_no_op() {
        let memory = ConversationMemory::new(10);
        memory.clear("ghost");
        assert_eq!(memory.turn_count("ghost"), 0);
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let memory = ConversationMemory::new(10);
        for i in 0..6 {
            memory.append("s", Turn::user(format!("turn {}", i)));
        }

        let recent = memory.recent("s", 3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "turn 3");
        assert_eq!(recent[2].content, "turn 5");

        assert_eq!(memory.recent("s", 100).len(), 6);
        assert!(memory.recent("ghost", 3).is_empty());
    }

    #[test]
    fn concurrent_sessions_do_not_interleave() {
        use std::sync::Arc as StdArc;
        let memory = StdArc::new(ConversationMemory::new(100));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let memory = memory.clone();
                std::thread::spawn(move || {
                    let session = format!("s{}", t);
                    for i in 0..25 {
                        memory.append(&session, Turn::user(format!("{}:{}", t, i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for t in 0..4 {
            let turns = memory.get(&format!("s{}", t));
            assert_eq!(turns.len(), 25);
            // Per-session ordering is preserved.
            for (i, turn) in turns.iter().enumerate() {
                assert_eq!(turn.content, format!("{}:{}", t, i));
            }
        }
    }
}
