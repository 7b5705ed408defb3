//! Text actions and their instruction templates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::services::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAction {
    Improve,
    Expand,
    Summarize,
    FixGrammar,
    Generate,
    MakeProfessional,
    MakeCasual,
}

impl TextAction {
    pub const ALL: [TextAction; 7] = [
        TextAction::Improve,
        TextAction::Expand,
        TextAction::Summarize,
        TextAction::FixGrammar,
        TextAction::Generate,
        TextAction::MakeProfessional,
        TextAction::MakeCasual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextAction::Improve => "improve",
            TextAction::Expand => "expand",
            TextAction::Summarize => "summarize",
            TextAction::FixGrammar => "fix-grammar",
            TextAction::Generate => "generate",
            TextAction::MakeProfessional => "make-professional",
            TextAction::MakeCasual => "make-casual",
        }
    }

    /// System instruction sent ahead of the user's text
    pub fn instruction(&self) -> &'static str {
        match self {
            TextAction::Improve => {
                "Improve the following text. Make it clearer and more engaging while keeping its meaning. Return only the improved text."
            }
            TextAction::Expand => {
                "Expand the following text with more detail, examples and context. Return only the expanded text."
            }
            TextAction::Summarize => {
                "Summarize the following text concisely, keeping the key points. Return only the summary."
            }
            TextAction::FixGrammar => {
                "Fix the grammar, spelling and punctuation of the following text without changing its meaning. Return only the corrected text."
            }
            TextAction::Generate => {
                "Generate content based on the following prompt. Return only the generated text."
            }
            TextAction::MakeProfessional => {
                "Rewrite the following text in a professional, formal tone. Return only the rewritten text."
            }
            TextAction::MakeCasual => {
                "Rewrite the following text in a casual, friendly tone. Return only the rewritten text."
            }
        }
    }

    /// Instruction with the optional caller context appended
    pub fn system_prompt(&self, context: Option<&str>) -> String {
        match context.map(str::trim).filter(|c| !c.is_empty()) {
            Some(context) => format!("{}\n\nContext: {}", self.instruction(), context),
            None => self.instruction().to_string(),
        }
    }
}

impl fmt::Display for TextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextAction {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TextAction::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ServiceError::invalid_input(format!("Invalid action: {}", s)))
    }
}
