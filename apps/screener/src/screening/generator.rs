//! Assessment generation: one model call per session, strictly decoded.

use tracing::{info, warn};

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LanguageModel, ModelRequest};
use crate::screening::assessment::{decode_assessment, AssessmentError, TechAssessment};
use crate::screening::prompts::TECH_QUESTIONS_PROMPT_TEMPLATE;

/// Generates 3–5 questions per technology. Errors are not retried.
pub async fn generate_assessment(
    llm: &dyn LanguageModel,
    tech_stack: &[String],
) -> Result<TechAssessment, AssessmentError> {
    let prompt = TECH_QUESTIONS_PROMPT_TEMPLATE.replace("{tech_stack}", &tech_stack.join(", "));
    let request = ModelRequest::prompt(prompt).with_system(JSON_ONLY_SYSTEM);

    let text = llm.complete(&request).await?;
    let assessment = decode_assessment(&text).inspect_err(|e| {
        warn!("Assessment output rejected: {e}");
    })?;

    info!(
        "Generated {} questions across {} technologies",
        assessment.question_count(),
        assessment.assessment.len()
    );
    Ok(assessment)
}
