//! Diagnostic endpoints
//!
//! Only compiled with the `debug-endpoints` feature. Responses include raw
//! internal error text, so this must never be enabled in production.
//!
//! - `GET /api/ai/debug` - Raw outcome of the caller's API key lookup

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsLookup {
    pub user_id: String,
    pub has_api_key: bool,
    /// Length of the stored key; the key itself is never echoed
    pub key_length: Option<usize>,
    pub error: Option<String>,
    pub missing_schema: bool,
}

async fn debug_settings(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<SettingsLookup> {
    let user_id = user.user_id().to_string();

    let lookup = match state.db.db_get_api_key(&user_id).await {
        Ok(key) => SettingsLookup {
            has_api_key: key.is_some(),
            key_length: key.map(|k| k.len()),
            error: None,
            missing_schema: false,
            user_id,
        },
        Err(e) => SettingsLookup {
            has_api_key: false,
            key_length: None,
            missing_schema: e.is_missing_schema(),
            error: Some(e.to_string()),
            user_id,
        },
    };

    Json(lookup)
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/ai/debug", get(debug_settings))
        .with_state(state)
}
