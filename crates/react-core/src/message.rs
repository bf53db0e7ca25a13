//! Conversation Turns
//!
//! Session-level history. Only condensed {instruction, answer} pairs land
//! here; scratchpad reasoning never does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a turn author
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User instruction
    User,
    /// Agent final answer
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Agent"),
        }
    }
}

/// A single conversation turn
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered conversation history
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one completed instruction into history.
    pub fn push_exchange(&mut self, instruction: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn::user(instruction));
        self.turns.push(Turn::assistant(answer));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent `exchanges` user/agent pairs, oldest first.
    pub fn recent(&self, exchanges: usize) -> &[Turn] {
        let keep = exchanges.saturating_mul(2).min(self.turns.len());
        &self.turns[self.turns.len() - keep..]
    }

    /// Render the recent window for the `{conversation_history}` placeholder.
    pub fn render_recent(&self, exchanges: usize) -> String {
        let window = self.recent(exchanges);
        if window.is_empty() {
            return "No previous conversation.".into();
        }

        let mut out = String::from("Recent Conversation History (chronological order):\n");
        for turn in window {
            out.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }
        out.truncate(out.trim_end().len());
        out
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_window_keeps_latest_pairs() {
        let mut conv = Conversation::new();
        conv.push_exchange("q1", "a1");
        conv.push_exchange("q2", "a2");
        conv.push_exchange("q3", "a3");

        let window = conv.recent(2);
        assert_eq!(window.len(), 4);
        assert_eq!(window[0].content, "q2");
        assert_eq!(window[3].content, "a3");
        assert_eq!(conv.recent(10).len(), 6);
    }

    #[test]
    fn test_render_empty_history() {
        let conv = Conversation::new();
        assert_eq!(conv.render_recent(3), "No previous conversation.");
    }

    #[test]
    fn test_render_recent() {
        let mut conv = Conversation::new();
        conv.push_exchange("What is 2+2?", "4");
        let rendered = conv.render_recent(3);
        assert!(rendered.contains("User: What is 2+2?"));
        assert!(rendered.ends_with("Agent: 4"));
    }
}
