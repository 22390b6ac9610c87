//! Bounded per-session conversation history.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
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

/// One message in a session's conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Monotonically increasing per session, including dropped turns, so
    /// gaps reveal how much history was evicted.
    pub seq: u64,
}

/// Append-only turn sequence capped at a fixed number of most-recent turns.
///
/// Appending past the cap drops the oldest turns first while preserving the
/// relative order of the remainder.
#[derive(Clone, Debug)]
pub struct TurnBuffer {
    turns: VecDeque<Turn>,
    next_seq: u64,
    cap: usize,
}

impl TurnBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            next_seq: 0,
            cap: cap.max(1),
        }
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push_back(Turn {
            role,
            content: content.into(),
            seq: self.next_seq,
        });
        self.next_seq += 1;
        while self.turns.len() > self.cap {
            self.turns.pop_front();
        }
    }

    /// Most-recent-last view of the retained turns.
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Owned copy for use outside the session lock.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
