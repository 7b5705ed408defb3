//! Generation API error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AiError {
    /// The provider answered with a non-success status
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// The provider could not be reached or the exchange was cut off
    #[error("Generation request failed: {0}")]
    Network(String),

    #[error("Generation request timed out")]
    Timeout,

    /// The provider answered 2xx but the body does not match the expected shape
    #[error("Failed to parse AI response: {0}")]
    ContractViolation(String),
}

impl AiError {
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::ContractViolation(msg.into())
    }

    /// Classify a transport failure from reqwest
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AiError::Timeout
        } else {
            AiError::Network(err.to_string())
        }
    }
}
