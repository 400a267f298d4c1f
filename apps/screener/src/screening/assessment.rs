//! Assessment schema and strict decoder for the question-generation output.
//!
//! The model is asked for `{"assessment": {"<technology>": [{"question": "..."}]}}`.
//! Decoding keeps technologies in the order the model emitted them, so the
//! flattened question queue follows that order too.

use std::collections::HashSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::llm_client::{strip_json_fences, LlmError};

pub const MIN_QUESTIONS_PER_TECHNOLOGY: usize = 3;
pub const MAX_QUESTIONS_PER_TECHNOLOGY: usize = 5;

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("output does not match the assessment schema: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("assessment contains no technologies")]
    Empty,

    #[error("assessment contains a blank technology name")]
    BlankTechnology,

    #[error("technology '{0}' appears more than once")]
    DuplicateTechnology(String),

    #[error("technology '{technology}' has {count} questions (expected 3-5)")]
    QuestionCount { technology: String, count: usize },

    #[error("technology '{0}' has a blank question")]
    BlankQuestion(String),
}

/// A single technical question.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TechQuestion {
    pub question: String,
}

/// All questions generated for one technology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechnologyQuestions {
    pub technology: String,
    pub questions: Vec<TechQuestion>,
}

/// Technology-keyed assessment, in model emission order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TechAssessment {
    #[serde(deserialize_with = "ordered_assessment")]
    pub assessment: Vec<TechnologyQuestions>,
}

impl TechAssessment {
    pub fn question_count(&self) -> usize {
        self.assessment.iter().map(|t| t.questions.len()).sum()
    }

    /// Concatenates every question in technology order.
    pub fn flatten(&self) -> Vec<String> {
        self.assessment
            .iter()
            .flat_map(|t| t.questions.iter().map(|q| q.question.clone()))
            .collect()
    }

    fn validate(&self) -> Result<(), AssessmentError> {
        if self.assessment.is_empty() {
            return Err(AssessmentError::Empty);
        }

        let mut seen = HashSet::new();
        for entry in &self.assessment {
            let technology = entry.technology.trim();
            if technology.is_empty() {
                return Err(AssessmentError::BlankTechnology);
            }
            if !seen.insert(technology.to_lowercase()) {
                return Err(AssessmentError::DuplicateTechnology(technology.to_string()));
            }

            let count = entry.questions.len();
            if !(MIN_QUESTIONS_PER_TECHNOLOGY..=MAX_QUESTIONS_PER_TECHNOLOGY).contains(&count) {
                return Err(AssessmentError::QuestionCount {
                    technology: technology.to_string(),
                    count,
                });
            }
            if entry.questions.iter().any(|q| q.question.trim().is_empty()) {
                return Err(AssessmentError::BlankQuestion(technology.to_string()));
            }
        }
        Ok(())
    }
}

/// Parses raw model output strictly against the assessment schema.
/// No repair is attempted beyond stripping markdown code fences.
pub fn decode_assessment(text: &str) -> Result<TechAssessment, AssessmentError> {
    let parsed: TechAssessment = serde_json::from_str(strip_json_fences(text))?;
    parsed.validate()?;
    Ok(parsed)
}

fn ordered_assessment<'de, D>(deserializer: D) -> Result<Vec<TechnologyQuestions>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedVisitor;

    impl<'de> Visitor<'de> for OrderedVisitor {
        type Value = Vec<TechnologyQuestions>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of technology name to a list of questions")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((technology, questions)) =
                map.next_entry::<String, Vec<TechQuestion>>()?
            {
                entries.push(TechnologyQuestions {
                    technology,
                    questions,
                });
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(OrderedVisitor)
}
