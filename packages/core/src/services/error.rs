//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations. Variants map
//! onto the user-visible error classes: bad input, missing resources,
//! configuration problems, provider failures and storage failures.

use crate::ai::AiError;
use crate::db::DatabaseError;
use crate::models::ValidationError;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Caller-supplied input is missing or malformed
    #[error("{0}")]
    InvalidInput(String),

    /// Model validation failed
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Resource absent, or not owned by the caller
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// The caller has not stored a provider API key
    #[error("OpenAI API key not configured. Please add your API key in Settings.")]
    ApiKeyNotSet,

    /// Backing table or column is absent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Database operation failed
    #[error("Database operation failed: {0}")]
    Database(DatabaseError),

    /// Generation provider call failed or returned an unexpected shape
    #[error(transparent)]
    Ai(#[from] AiError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),
}

impl ServiceError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        if err.is_missing_schema() {
            ServiceError::Configuration(err.to_string())
        } else {
            ServiceError::Database(err)
        }
    }
}
