//! Structured chat responses
//!
//! Suggestions and text analysis ask the provider for a JSON object. The
//! content is checked here; a 2xx answer with the wrong shape is an
//! [`AiError::ContractViolation`], never a provider error.

use serde::{Deserialize, Serialize};

use crate::ai::AiError;

pub const SUGGESTION_COUNT: usize = 3;
pub const MIN_ANALYSIS_OPTIONS: usize = 3;
pub const MAX_ANALYSIS_OPTIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub suggestion: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOption {
    pub title: String,
    pub content: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub analysis: String,
    pub options: Vec<AnalysisOption>,
}

pub const SUGGESTIONS_SYSTEM_PROMPT: &str = "You are a creative assistant for a mind-mapping canvas. \
Respond with a JSON object of the form {\"suggestions\": [{\"suggestion\": string, \"explanation\": string}]} \
containing exactly 3 suggestions.";

pub const ANALYSIS_SYSTEM_PROMPT: &str = "You analyze text for a mind-mapping canvas following the user's instructions. \
Respond with a JSON object of the form {\"analysis\": string, \"options\": [{\"title\": string, \"content\": string, \"reasoning\": string}]} \
containing between 3 and 5 options.";

/// Parse and check a suggestions response
pub fn parse_suggestions(content: &str) -> Result<SuggestionSet, AiError> {
    let set: SuggestionSet = serde_json::from_str(content)
        .map_err(|e| AiError::contract(format!("suggestions: {}", e)))?;

    if set.suggestions.len() != SUGGESTION_COUNT {
        return Err(AiError::contract(format!(
            "expected {} suggestions, got {}",
            SUGGESTION_COUNT,
            set.suggestions.len()
        )));
    }
    Ok(set)
}

/// Parse and check a text analysis response
pub fn parse_analysis(content: &str) -> Result<TextAnalysis, AiError> {
    let analysis: TextAnalysis = serde_json::from_str(content)
        .map_err(|e| AiError::contract(format!("analysis: {}", e)))?;

    let count = analysis.options.len();
    if !(MIN_ANALYSIS_OPTIONS..=MAX_ANALYSIS_OPTIONS).contains(&count) {
        return Err(AiError::contract(format!(
            "expected {}-{} options, got {}",
            MIN_ANALYSIS_OPTIONS, MAX_ANALYSIS_OPTIONS, count
        )));
    }
    Ok(analysis)
}
