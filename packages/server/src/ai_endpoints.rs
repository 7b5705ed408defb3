//! AI proxy endpoints
//!
//! # Endpoints
//!
//! - `POST /api/ai/image` - `{prompt, size?, quality?}` → `{url, revised_prompt}`
//! - `POST /api/ai/suggestions` - `{prompt, context?}` → `{suggestions: [..3]}`
//! - `POST /api/ai/text-analysis` - `{instructions, text?}` → `{analysis, options}`
//! - `POST /api/ai/text` - `{text, action, context?}` → `{text, usage}`
//!
//! Authentication is checked by the [`CurrentUser`] extractor before the
//! body is read; everything after that lives in [`mindgrid_core::ai::AiService`].

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    routing::post,
    Router,
};

use mindgrid_core::ai::{
    AnalysisInput, ImageInput, StoredImage, SuggestionInput, SuggestionSet, TextAnalysis,
    TextInput, TextOutput,
};

use crate::auth::CurrentUser;
use crate::{AppState, HttpError};

async fn generate_image(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<ImageInput>, JsonRejection>,
) -> Result<Json<StoredImage>, HttpError> {
    let Json(input) = payload?;
    Ok(Json(state.ai.generate_image(user.user_id(), input).await?))
}

async fn suggestions(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<SuggestionInput>, JsonRejection>,
) -> Result<Json<SuggestionSet>, HttpError> {
    let Json(input) = payload?;
    Ok(Json(state.ai.suggestions(user.user_id(), input).await?))
}

async fn text_analysis(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<AnalysisInput>, JsonRejection>,
) -> Result<Json<TextAnalysis>, HttpError> {
    let Json(input) = payload?;
    Ok(Json(state.ai.analyze_text(user.user_id(), input).await?))
}

async fn text(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<TextInput>, JsonRejection>,
) -> Result<Json<TextOutput>, HttpError> {
    let Json(input) = payload?;
    Ok(Json(state.ai.transform_text(user.user_id(), input).await?))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/ai/image", post(generate_image))
        .route("/api/ai/suggestions", post(suggestions))
        .route("/api/ai/text-analysis", post(text_analysis))
        .route("/api/ai/text", post(text))
        .with_state(state)
}
