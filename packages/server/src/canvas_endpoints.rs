//! Canvas, folder, graph and settings endpoints
//!
//! # Endpoints
//!
//! - `GET /api/health` - Health check
//! - `GET /api/canvases` - The caller's canvases
//! - `POST /api/canvases` - Create a canvas
//! - `GET /api/folders` - The caller's folders, ordered by name
//! - `POST /api/folders` - Create a folder
//! - `GET /api/canvases/:id/graph` - Load the node/edge graph
//! - `PUT /api/canvases/:id/graph` - Replace the node/edge graph
//! - `DELETE /api/canvases/:id/edges/:edge_id` - Permanently delete an edge
//! - `GET /api/settings` - Whether an API key is stored
//! - `PUT /api/settings` - Store or clear the API key
//! - `POST /api/auth/logout` - End the current session

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mindgrid_core::{
    ApiKeyStatus, Canvas, CanvasGraph, CreatedCanvas, Folder, GraphService, NewCanvas,
};

use crate::auth::CurrentUser;
use crate::{AppState, HttpError};

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create a canvas
///
/// Answers `201 Created` with `Location: /canvas/{id}` and
/// `{ canvas, redirectTo }`.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:3000/api/canvases \
///   -H "Authorization: Bearer $TOKEN" -H "Content-Type: application/json" \
///   -d '{"name": "Roadmap", "description": "Q3 planning"}'
/// ```
async fn create_canvas(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<NewCanvas>, JsonRejection>,
) -> Result<Response, HttpError> {
    let Json(input) = payload?;
    let created: CreatedCanvas = state.canvases.create_canvas(user.user_id(), input).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, created.redirect_to.clone())],
        Json(created),
    )
        .into_response())
}

async fn list_canvases(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Canvas>>, HttpError> {
    Ok(Json(state.canvases.list_canvases(user.user_id()).await?))
}

async fn list_folders(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Folder>>, HttpError> {
    Ok(Json(state.canvases.list_folders(user.user_id()).await?))
}

#[derive(Debug, Deserialize)]
pub struct NewFolder {
    #[serde(default)]
    pub name: String,
}

async fn create_folder(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<NewFolder>, JsonRejection>,
) -> Result<(StatusCode, Json<Folder>), HttpError> {
    let Json(input) = payload?;
    let folder = state
        .canvases
        .create_folder(user.user_id(), &input.name)
        .await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

async fn get_graph(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(canvas_id): Path<String>,
) -> Result<Json<CanvasGraph>, HttpError> {
    Ok(Json(state.graphs.load_graph(user.user_id(), &canvas_id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSaved {
    pub nodes_written: usize,
    pub nodes_deleted: usize,
    pub edges_written: usize,
    pub edges_deleted: usize,
    pub edges_skipped: usize,
}

/// Replace the graph of a canvas
///
/// The body is decoded by hand so unknown node types surface as 400 with a
/// specific message instead of a generic body rejection.
async fn save_graph(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(canvas_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<GraphSaved>, HttpError> {
    let Json(body) = payload?;
    let graph = GraphService::decode_graph(body)?;

    let summary = state
        .graphs
        .save_graph(user.user_id(), &canvas_id, graph)
        .await?;

    Ok(Json(GraphSaved {
        nodes_written: summary.nodes_written,
        nodes_deleted: summary.nodes_deleted,
        edges_written: summary.edges_written,
        edges_deleted: summary.edges_deleted,
        edges_skipped: summary.edges_skipped,
    }))
}

async fn delete_edge(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((canvas_id, edge_id)): Path<(String, String)>,
) -> Result<StatusCode, HttpError> {
    state
        .graphs
        .delete_edge(user.user_id(), &canvas_id, &edge_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_settings(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiKeyStatus>, HttpError> {
    Ok(Json(state.settings.api_key_status(user.user_id()).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

async fn update_settings(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<SettingsUpdate>, JsonRejection>,
) -> Result<Json<ApiKeyStatus>, HttpError> {
    let Json(update) = payload?;
    let status = state
        .settings
        .set_api_key(user.user_id(), update.openai_api_key.as_deref())
        .await?;
    Ok(Json(status))
}

async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<StatusCode, HttpError> {
    state.sessions.end_session(&user.0.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/canvases", get(list_canvases).post(create_canvas))
        .route("/api/folders", get(list_folders).post(create_folder))
        .route("/api/canvases/:id/graph", get(get_graph).put(save_graph))
        .route("/api/canvases/:id/edges/:edge_id", delete(delete_edge))
        .route("/api/settings", get(get_settings).put(update_settings))
        .route("/api/auth/logout", post(logout))
        .with_state(state)
}
