use std::sync::Arc;

use crate::llm_client::LanguageModel;
use crate::screening::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable model backend. Default: the Gemini `LlmClient`.
    pub llm: Arc<dyn LanguageModel>,
    pub sessions: SessionStore,
}
