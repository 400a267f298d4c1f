//! Scripted model for tests: returns queued responses and records every request.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{LanguageModel, LlmError, ModelRequest};

pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful text response.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    /// Queue a failing call.
    pub fn fail(self) -> Self {
        self.responses.lock().unwrap().push_back(Err(LlmError::Api {
            status: 503,
            message: "model unavailable".to_string(),
        }));
        self
    }

    pub fn recorded_requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &ModelRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}
