/// LLM Client — the single point of entry for all model calls in the screener.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// Screening code depends on the `LanguageModel` trait, never on `LlmClient`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
#[cfg(test)]
pub mod testing;

const GENERATE_CONTENT_PATH: &str = "v1beta/models";
const MAX_OUTPUT_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
/// Sampling temperature used for every screening call.
pub const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One message exchange unit: who said it, and what they said.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// A provider-neutral model request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system: Option<String>,
    pub messages: Vec<Turn>,
    pub temperature: f32,
}

impl ModelRequest {
    /// A single user prompt with no system instruction.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            system: None,
            messages: vec![Turn::user(text)],
            temperature: TEMPERATURE,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// The opaque generate-text capability the screening flow depends on.
/// Implement this to swap providers (or to script responses in tests).
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> Result<String, LlmError>;

    fn model_id(&self) -> &str;
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GeminiResponse {
    /// Concatenates the text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn translate_request(request: &ModelRequest) -> GeminiRequest<'_> {
    GeminiRequest {
        contents: request
            .messages
            .iter()
            .map(|turn| GeminiContent {
                role: Some(wire_role(turn.role)),
                parts: vec![GeminiPart { text: &turn.text }],
            })
            .collect(),
        system_instruction: request.system.as_deref().map(|system| GeminiContent {
            role: None,
            parts: vec![GeminiPart { text: system }],
        }),
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

/// The Gemini-backed model client used in production.
/// Wraps the `generateContent` endpoint with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    retry_base: Duration,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: &str) -> Result<Self, LlmError> {
        let endpoint = format!(
            "{}/{GENERATE_CONTENT_PATH}/{model}:generateContent",
            base_url.trim_end_matches('/')
        );
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            model,
            endpoint,
            retry_base: RETRY_BASE_DELAY,
        })
    }

    /// Overrides the first backoff step; later steps double it.
    #[cfg(test)]
    pub fn with_retry_base(mut self, delay: Duration) -> Self {
        self.retry_base = delay;
        self
    }

    /// Makes a raw call to the Gemini API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    /// The key travels in the `x-goog-api-key` header, never in the URL.
    pub async fn call(&self, request: &ModelRequest) -> Result<GeminiResponse, LlmError> {
        let request_body = translate_request(request);

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = self.retry_base * (1 << (attempt - 1));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .header("x-goog-api-key", &self.api_key)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<GeminiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let gemini_response: GeminiResponse = response.json().await?;

            if let Some(usage) = &gemini_response.usage_metadata {
                debug!(
                    "LLM call succeeded: model={}, prompt_tokens={}, output_tokens={}",
                    self.model, usage.prompt_token_count, usage.candidates_token_count
                );
            }

            return Ok(gemini_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn complete(&self, request: &ModelRequest) -> Result<String, LlmError> {
        self.call(request).await?.text().ok_or(LlmError::EmptyContent)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_translate_request_maps_roles_and_system() {
        let request = ModelRequest {
            system: Some("be brief".to_string()),
            messages: vec![Turn::user("hi"), Turn::assistant("hello")],
            temperature: TEMPERATURE,
        };
        let body = serde_json::to_value(translate_request(&request)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["text"], "hello");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
    }

    #[test]
    fn test_translate_request_omits_missing_system() {
        let body = serde_json::to_value(translate_request(&ModelRequest::prompt("x"))).unwrap();
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_text_joins_first_candidate_parts() {
        let json = r#"{
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "Python, "}, {"text": "SQL"}]}},
                {"content": {"role": "model", "parts": [{"text": "ignored"}]}}
            ],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 3}
        }"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().as_deref(), Some("Python, SQL"));
        assert_eq!(response.usage_metadata.unwrap().prompt_token_count, 10);
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_endpoint_built_from_base_url_and_model() {
        let client = LlmClient::new(
            "key".to_string(),
            "gemini-2.5-flash-lite".to_string(),
            "https://example.test/",
        )
        .unwrap();
        assert_eq!(
            client.endpoint,
            "https://example.test/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
        assert_eq!(client.model_id(), "gemini-2.5-flash-lite");
    }

    mod transport {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::{Arc, Mutex};
        use std::time::Duration;

        use axum::{
            http::{HeaderMap, StatusCode, Uri},
            response::IntoResponse,
            Json, Router,
        };
        use serde_json::json;

        use crate::llm_client::{
            LanguageModel, LlmClient, LlmError, ModelRequest, MAX_RETRIES,
        };

        /// What the local Gemini stand-in saw on one request.
        #[derive(Debug, Clone)]
        struct Seen {
            api_key: Option<String>,
            query: Option<String>,
        }

        struct StubGemini {
            base_url: String,
            hits: Arc<AtomicUsize>,
            seen: Arc<Mutex<Vec<Seen>>>,
        }

        /// Serves `statuses` in order on 127.0.0.1, then answers 200 with text "ok".
        async fn stub_gemini(statuses: &[u16]) -> StubGemini {
            let hits = Arc::new(AtomicUsize::new(0));
            let seen = Arc::new(Mutex::new(Vec::new()));
            let statuses = Arc::new(statuses.to_vec());

            let handler = {
                let hits = hits.clone();
                let seen = seen.clone();
                move |uri: Uri, headers: HeaderMap| {
                    let hits = hits.clone();
                    let seen = seen.clone();
                    let statuses = statuses.clone();
                    async move {
                        let attempt = hits.fetch_add(1, Ordering::SeqCst);
                        seen.lock().unwrap().push(Seen {
                            api_key: headers
                                .get("x-goog-api-key")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string),
                            query: uri.query().map(str::to_string),
                        });
                        match statuses.get(attempt) {
                            Some(&code) => (
                                StatusCode::from_u16(code).unwrap(),
                                Json(json!({"error": {"code": code, "message": "stubbed failure"}})),
                            )
                                .into_response(),
                            None => Json(json!({
                                "candidates": [{"content": {"role": "model", "parts": [{"text": "ok"}]}}]
                            }))
                            .into_response(),
                        }
                    }
                }
            };
            let app: Router = Router::new().fallback(handler);

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            StubGemini {
                base_url: format!("http://{addr}"),
                hits,
                seen,
            }
        }

        fn client_for(stub: &StubGemini) -> LlmClient {
            LlmClient::new("test-key".to_string(), "stub-model".to_string(), &stub.base_url)
                .unwrap()
                .with_retry_base(Duration::from_millis(5))
        }

        #[tokio::test]
        async fn test_server_errors_are_retried_until_success() {
            let stub = stub_gemini(&[503, 503]).await;
            let text = client_for(&stub)
                .complete(&ModelRequest::prompt("hi"))
                .await
                .unwrap();

            assert_eq!(text, "ok");
            assert_eq!(stub.hits.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn test_client_error_fails_without_retry() {
            let stub = stub_gemini(&[400]).await;
            let err = client_for(&stub)
                .complete(&ModelRequest::prompt("hi"))
                .await
                .unwrap_err();

            match err {
                LlmError::Api { status, message } => {
                    assert_eq!(status, 400);
                    assert_eq!(message, "stubbed failure");
                }
                other => panic!("expected Api error, got {other:?}"),
            }
            assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_rate_limit_gives_up_after_max_attempts() {
            let stub = stub_gemini(&[429, 429, 429, 429]).await;
            let err = client_for(&stub)
                .complete(&ModelRequest::prompt("hi"))
                .await
                .unwrap_err();

            assert!(matches!(err, LlmError::Api { status: 429, .. }));
            assert_eq!(stub.hits.load(Ordering::SeqCst), MAX_RETRIES as usize);
        }

        #[tokio::test]
        async fn test_api_key_sent_as_header_not_query() {
            let stub = stub_gemini(&[]).await;
            client_for(&stub)
                .complete(&ModelRequest::prompt("hi"))
                .await
                .unwrap();

            let seen = stub.seen.lock().unwrap().clone();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].api_key.as_deref(), Some("test-key"));
            assert!(seen[0].query.is_none());
        }
    }
}
