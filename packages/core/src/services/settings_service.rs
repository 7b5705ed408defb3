//! Per-user settings: the stored provider API key
//!
//! The AI endpoints need to tell "the user has not entered a key" (their
//! problem, 400) apart from "the settings store is not set up" (ours, 500).
//! [`SettingsService::require_api_key`] makes that distinction.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::db::DatabaseService;
use crate::services::ServiceError;

pub struct SettingsService {
    db: Arc<DatabaseService>,
}

/// Whether a user has a key on file, without revealing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyStatus {
    pub has_api_key: bool,
}

impl SettingsService {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// The caller's API key
    ///
    /// # Errors
    ///
    /// - `ApiKeyNotSet` when no row exists or the key is empty
    /// - `Configuration` when the settings table or column is missing
    pub async fn require_api_key(&self, user_id: &str) -> Result<String, ServiceError> {
        let key = self.db.db_get_api_key(user_id).await.map_err(|e| {
            if e.is_missing_schema() {
                error!(error = %e, "user_settings.openai_api_key is not available");
            }
            ServiceError::from(e)
        })?;

        match key {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ServiceError::ApiKeyNotSet),
        }
    }

    pub async fn api_key_status(&self, user_id: &str) -> Result<ApiKeyStatus, ServiceError> {
        let key = self.db.db_get_api_key(user_id).await?;
        Ok(ApiKeyStatus {
            has_api_key: key.is_some_and(|k| !k.trim().is_empty()),
        })
    }

    /// Store or clear the caller's API key. Blank input clears it.
    pub async fn set_api_key(
        &self,
        user_id: &str,
        api_key: Option<&str>,
    ) -> Result<ApiKeyStatus, ServiceError> {
        let api_key = api_key.map(str::trim).filter(|k| !k.is_empty());
        self.db.db_set_api_key(user_id, api_key).await?;
        info!(user_id, has_api_key = api_key.is_some(), "api key updated");
        Ok(ApiKeyStatus {
            has_api_key: api_key.is_some(),
        })
    }
}
