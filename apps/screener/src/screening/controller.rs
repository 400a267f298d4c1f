//! Conversation controller: routes each candidate message by state and
//! produces the reply plus the next state.
//!
//! ```text
//! Greeting ──any──▶ GatherInfo ──marker + "next"──▶ AskQuestions ──queue empty──▶ End
//!                        │                                ▲
//!                        └── generation failed ───────────┼──────────────────────▶ End
//! any state ── exit word ─────────────────────────────────┴──────────────────────▶ End
//! ```

use tracing::{info, warn};

use crate::llm_client::{LanguageModel, LlmError, ModelRequest, Turn, TEMPERATURE};
use crate::screening::extractor::extract_tech_stack;
use crate::screening::generator::generate_assessment;
use crate::screening::history::HISTORY_WINDOW_PAIRS;
use crate::screening::prompts::{
    ASSESSMENT_MARKER, CLOSING_MESSAGE, CONFIRM_TOKEN, EXIT_WORDS, GENERATION_FAILED_MESSAGE,
    INFO_GATHERING_SYSTEM, NOT_UNDERSTOOD_MESSAGE,
};
use crate::screening::session::ScreeningSession;
use crate::screening::state::ConversationState;

/// What the candidate sees next, and the state the session moves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub state: ConversationState,
}

impl Reply {
    fn new(text: impl Into<String>, state: ConversationState) -> Self {
        Self {
            text: text.into(),
            state,
        }
    }
}

pub fn is_exit_word(input: &str) -> bool {
    EXIT_WORDS.iter().any(|w| input.eq_ignore_ascii_case(w))
}

/// Whether an assistant turn announced the move to the technical assessment.
pub fn announces_assessment(turn: Option<&Turn>) -> bool {
    turn.is_some_and(|t| t.text.to_lowercase().contains(ASSESSMENT_MARKER))
}

pub fn confirms(input: &str) -> bool {
    input.to_lowercase().contains(CONFIRM_TOKEN)
}

/// Advances `session` by one candidate message.
///
/// Only the information-gathering call can fail; on failure the session is
/// left exactly as it was. Extraction and generation failures are absorbed
/// into the reply.
pub async fn advance(
    llm: &dyn LanguageModel,
    session: &mut ScreeningSession,
    user_input: &str,
) -> Result<Reply, LlmError> {
    let reply = if is_exit_word(user_input) {
        Reply::new(CLOSING_MESSAGE, ConversationState::End)
    } else {
        match session.state {
            ConversationState::Greeting => {
                let text = gather_info(llm, session, user_input).await?;
                Reply::new(text, ConversationState::GatherInfo)
            }
            ConversationState::GatherInfo => {
                if announces_assessment(session.history.last_assistant()) && confirms(user_input)
                {
                    begin_assessment(llm, session).await
                } else {
                    let text = gather_info(llm, session, user_input).await?;
                    Reply::new(text, ConversationState::GatherInfo)
                }
            }
            ConversationState::AskQuestions => answer_question(session, user_input),
            ConversationState::End => Reply::new(NOT_UNDERSTOOD_MESSAGE, session.state),
        }
    };

    if reply.state != session.state {
        info!(
            "Session {} transitioned {} -> {}",
            session.id, session.state, reply.state
        );
    }
    session.transition_to(reply.state);
    Ok(reply)
}

/// Runs the information-gathering prompt over the windowed history and records the exchange.
async fn gather_info(
    llm: &dyn LanguageModel,
    session: &mut ScreeningSession,
    user_input: &str,
) -> Result<String, LlmError> {
    let mut messages = session.history.window(HISTORY_WINDOW_PAIRS).to_vec();
    messages.push(Turn::user(user_input));

    let request = ModelRequest {
        system: Some(INFO_GATHERING_SYSTEM.to_string()),
        messages,
        temperature: TEMPERATURE,
    };
    let response = llm.complete(&request).await?;

    session.history.record_exchange(user_input, &response);
    Ok(response)
}

async fn begin_assessment(llm: &dyn LanguageModel, session: &mut ScreeningSession) -> Reply {
    let tech_stack = extract_tech_stack(llm, &session.history).await;

    let questions = match generate_assessment(llm, &tech_stack.technologies).await {
        Ok(assessment) => assessment.flatten(),
        Err(e) => {
            warn!("Session {}: question generation failed: {e}", session.id);
            Vec::new()
        }
    };
    session.tech_stack = Some(tech_stack);
    session.load_questions(questions);

    match session.current_question() {
        Some(first) => Reply::new(
            format!(
                "Excellent. We have {} questions. **Question 1:** {first}",
                session.questions().len()
            ),
            ConversationState::AskQuestions,
        ),
        None => Reply::new(GENERATION_FAILED_MESSAGE, ConversationState::End),
    }
}

fn answer_question(session: &mut ScreeningSession, user_input: &str) -> Reply {
    session.record_answer(user_input);

    match session.current_question() {
        Some(next) => Reply::new(
            format!(
                "Thank you for your answer. \n\n**Question {}:** {next}",
                session.cursor() + 1
            ),
            ConversationState::AskQuestions,
        ),
        None => Reply::new(CLOSING_MESSAGE, ConversationState::End),
    }
}
