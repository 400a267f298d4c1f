//! Tech-stack extraction: one model call over the full history, never fails.

use serde::Serialize;
use tracing::{info, warn};

use crate::llm_client::prompts::LIST_ONLY_SYSTEM;
use crate::llm_client::{LanguageModel, ModelRequest};
use crate::screening::history::ConversationHistory;
use crate::screening::prompts::TECH_STACK_EXTRACTION_PROMPT;

/// Returned when extraction fails or yields nothing.
pub const FALLBACK_TECH_STACK: [&str; 2] = ["Python", "SQL"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TechStackSource {
    Extracted,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechStack {
    pub technologies: Vec<String>,
    pub source: TechStackSource,
}

impl TechStack {
    pub fn fallback() -> Self {
        Self {
            technologies: FALLBACK_TECH_STACK.iter().map(|t| t.to_string()).collect(),
            source: TechStackSource::Fallback,
        }
    }
}

/// Splits a comma-separated model reply into trimmed, non-empty tokens.
pub fn parse_tech_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Asks the model for the declared tech stack. Any failure degrades to the fallback list.
pub async fn extract_tech_stack(
    llm: &dyn LanguageModel,
    history: &ConversationHistory,
) -> TechStack {
    let prompt = TECH_STACK_EXTRACTION_PROMPT
        .replace("{history}", &ConversationHistory::render(history.turns()));
    let request = ModelRequest::prompt(prompt).with_system(LIST_ONLY_SYSTEM);

    match llm.complete(&request).await {
        Ok(text) => {
            let technologies = parse_tech_list(&text);
            if technologies.is_empty() {
                warn!("Tech stack extraction returned no technologies, using fallback");
                return TechStack::fallback();
            }
            info!("Extracted tech stack: {}", technologies.join(", "));
            TechStack {
                technologies,
                source: TechStackSource::Extracted,
            }
        }
        Err(e) => {
            warn!("Tech stack extraction failed, using fallback: {e}");
            TechStack::fallback()
        }
    }
}
