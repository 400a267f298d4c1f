use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a screening conversation currently is.
///
/// `Greeting` is initial, `End` is terminal: once reached, no transition leaves it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Greeting,
    GatherInfo,
    AskQuestions,
    End,
}

impl ConversationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConversationState::End)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConversationState::Greeting => "greeting",
            ConversationState::GatherInfo => "gather_info",
            ConversationState::AskQuestions => "ask_questions",
            ConversationState::End => "end",
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
