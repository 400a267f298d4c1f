//! Append-only conversation log with a bounded context window.

use serde::Serialize;

use crate::llm_client::{Role, Turn};

/// Number of (user, assistant) pairs supplied to the model as context.
pub const HISTORY_WINDOW_PAIRS: usize = 8;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Appends a completed exchange.
    pub fn record_exchange(&mut self, user: &str, assistant: &str) {
        self.push(Turn::user(user));
        self.push(Turn::assistant(assistant));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent `pairs` exchanges (2 × `pairs` turns); older turns are dropped.
    pub fn window(&self, pairs: usize) -> &[Turn] {
        let keep = pairs.saturating_mul(2);
        let start = self.turns.len().saturating_sub(keep);
        &self.turns[start..]
    }

    pub fn last_assistant(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.role == Role::Assistant)
    }

    /// Renders turns as `Candidate:`/`Assistant:` lines for prompt interpolation.
    pub fn render(turns: &[Turn]) -> String {
        turns
            .iter()
            .map(|t| {
                let speaker = match t.role {
                    Role::User => "Candidate",
                    Role::Assistant => "Assistant",
                };
                format!("{speaker}: {}", t.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
