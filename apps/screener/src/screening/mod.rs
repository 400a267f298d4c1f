// Candidate screening: guided information gathering, then a generated technical quiz.
// All LLM calls go through llm_client::LanguageModel — no direct Gemini calls here.

pub mod assessment;
pub mod controller;
pub mod extractor;
pub mod generator;
pub mod handlers;
pub mod history;
pub mod prompts;
pub mod session;
pub mod state;
pub mod store;
