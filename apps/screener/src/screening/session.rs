//! The single owned value holding everything one screening conversation mutates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use crate::llm_client::Turn;
use crate::screening::extractor::TechStack;
use crate::screening::history::ConversationHistory;
use crate::screening::prompts::GREETING_MESSAGE;
use crate::screening::state::ConversationState;

/// One recorded answer, labelled the way it is shown to reviewers (`Q1`, `Q2`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerRecord {
    pub label: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct ScreeningSession {
    pub id: Uuid,
    pub state: ConversationState,
    /// Model context: only information-gathering exchanges.
    pub history: ConversationHistory,
    /// Everything shown to the candidate, including the opening greeting.
    pub transcript: Vec<Turn>,
    pub tech_stack: Option<TechStack>,
    questions: Vec<String>,
    /// Index of the question awaiting an answer; equals the number answered.
    cursor: usize,
    /// Keyed by the cursor position at the time of answering.
    answers: BTreeMap<usize, String>,
    pub created_at: DateTime<Utc>,
    /// Monotonic instant the session reached `End`; drives eviction.
    ended_at: Option<Instant>,
}

impl Default for ScreeningSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreeningSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ConversationState::Greeting,
            history: ConversationHistory::new(),
            transcript: vec![Turn::assistant(GREETING_MESSAGE)],
            tech_stack: None,
            questions: Vec::new(),
            cursor: 0,
            answers: BTreeMap::new(),
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Moves to `next`, stamping the first arrival at the terminal state.
    pub fn transition_to(&mut self, next: ConversationState) {
        if next.is_terminal() && self.ended_at.is_none() {
            self.ended_at = Some(Instant::now());
        }
        self.state = next;
    }

    pub fn ended_at(&self) -> Option<Instant> {
        self.ended_at
    }

    /// Replaces the question queue and rewinds the cursor. Called once per session.
    pub fn load_questions(&mut self, questions: Vec<String>) {
        self.questions = questions;
        self.cursor = 0;
        self.answers.clear();
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The question awaiting an answer, or `None` once the queue is exhausted.
    pub fn current_question(&self) -> Option<&str> {
        self.questions.get(self.cursor).map(String::as_str)
    }

    /// Stores `answer` verbatim against the current question and advances the cursor.
    /// A no-op once the queue is exhausted.
    pub fn record_answer(&mut self, answer: &str) {
        if self.cursor < self.questions.len() {
            self.answers.insert(self.cursor, answer.to_string());
            self.cursor += 1;
        }
    }

    pub fn answer_records(&self) -> Vec<AnswerRecord> {
        self.answers
            .iter()
            .map(|(&position, answer)| AnswerRecord {
                label: answer_label(position),
                question: self.questions.get(position).cloned().unwrap_or_default(),
                answer: answer.clone(),
            })
            .collect()
    }

    /// Appends one displayed exchange to the transcript.
    pub fn log_exchange(&mut self, user: &str, assistant: &str) {
        self.transcript.push(Turn::user(user));
        self.transcript.push(Turn::assistant(assistant));
    }
}

pub fn answer_label(position: usize) -> String {
    format!("Q{}", position + 1)
}
