//! Axum route handlers for the Screening API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::Turn;
use crate::screening::controller::advance;
use crate::screening::extractor::TechStack;
use crate::screening::session::AnswerRecord;
use crate::screening::state::ConversationState;
use crate::screening::store::SessionHandle;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SessionReply {
    pub session_id: Uuid,
    pub state: ConversationState,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub state: ConversationState,
    pub created_at: DateTime<Utc>,
    pub transcript: Vec<Turn>,
    pub tech_stack: Option<TechStack>,
    pub questions: Vec<String>,
    pub cursor: usize,
    pub answers: Vec<AnswerRecord>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
///
/// Starts a screening session and returns the opening greeting. No model call.
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionReply>) {
    let handle = state.sessions.create().await;
    let session = handle.lock().await;
    info!("Session {} started", session.id);

    let message = session
        .transcript
        .last()
        .map(|t| t.text.clone())
        .unwrap_or_default();

    (
        StatusCode::CREATED,
        Json(SessionReply {
            session_id: session.id,
            state: session.state,
            message,
        }),
    )
}

/// POST /api/v1/sessions/:id/messages
///
/// Feeds one candidate message through the controller. Ended sessions accept no input.
pub async fn handle_send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SessionReply>, AppError> {
    let Json(request) = payload?;
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }

    let handle = find_session(&state, id).await?;
    let mut session = handle.lock().await;

    if session.state.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Session {id} has concluded and accepts no further input"
        )));
    }

    let reply = advance(state.llm.as_ref(), &mut session, &request.text)
        .await
        .map_err(|e| AppError::Llm(format!("Information gathering failed: {e}")))?;

    session.log_exchange(&request.text, &reply.text);

    Ok(Json(SessionReply {
        session_id: id,
        state: reply.state,
        message: reply.text,
    }))
}

/// GET /api/v1/sessions/:id
///
/// Returns the transcript, question queue and recorded answers.
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = find_session(&state, id).await?;
    let session = handle.lock().await;

    Ok(Json(SessionView {
        session_id: session.id,
        state: session.state,
        created_at: session.created_at,
        transcript: session.transcript.clone(),
        tech_stack: session.tech_stack.clone(),
        questions: session.questions().to_vec(),
        cursor: session.cursor(),
        answers: session.answer_records(),
    }))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        info!("Session {id} discarded");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

async fn find_session(state: &AppState, id: Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}
