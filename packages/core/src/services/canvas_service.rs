//! Canvas Service
//!
//! Canvas creation and folder listing. A canvas is created with a single
//! insert, so a failure at any step leaves nothing behind.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::db::DatabaseService;
use crate::models::{Canvas, Folder, NewCanvas};
use crate::services::ServiceError;

/// Result of a successful creation: the canvas and where to send the user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCanvas {
    pub canvas: Canvas,
    pub redirect_to: String,
}

/// Detail-view path of a canvas
pub fn canvas_path(canvas_id: &str) -> String {
    format!("/canvas/{}", canvas_id)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct CanvasService {
    db: Arc<DatabaseService>,
}

impl CanvasService {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Create a canvas owned by `user_id`
    ///
    /// The organization comes from the caller's profile; without a profile
    /// or organization the canvas is created with `organization_id = NULL`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the name is blank (checked before any query)
    /// - `InvalidInput` if `folder_id` does not name one of the caller's folders
    /// - `Database` / `Configuration` on storage failure
    pub async fn create_canvas(
        &self,
        user_id: &str,
        input: NewCanvas,
    ) -> Result<CreatedCanvas, ServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::invalid_input("Canvas name is required"));
        }

        let folder_id = non_blank(input.folder_id);
        if let Some(folder_id) = &folder_id {
            match self.db.db_get_folder(folder_id).await? {
                Some(folder) if folder.user_id == user_id => {}
                _ => {
                    return Err(ServiceError::invalid_input(format!(
                        "Folder {} does not exist",
                        folder_id
                    )))
                }
            }
        }

        let organization_id = self
            .db
            .db_get_profile(user_id)
            .await?
            .and_then(|profile| profile.organization_id);

        let now = Utc::now();
        let canvas = Canvas {
            id: Uuid::new_v4().to_string(),
            name,
            description: non_blank(input.description),
            user_id: user_id.to_string(),
            organization_id,
            folder_id,
            created_at: now,
            updated_at: now,
        };

        self.db.db_create_canvas(&canvas).await?;

        info!(
            canvas_id = %canvas.id,
            user_id,
            organization_id = ?canvas.organization_id,
            "canvas created"
        );

        Ok(CreatedCanvas {
            redirect_to: canvas_path(&canvas.id),
            canvas,
        })
    }

    /// Canvas `canvas_id` if it exists and belongs to `user_id`
    pub async fn get_owned_canvas(
        &self,
        user_id: &str,
        canvas_id: &str,
    ) -> Result<Canvas, ServiceError> {
        match self.db.db_get_canvas(canvas_id).await? {
            Some(canvas) if canvas.user_id == user_id => Ok(canvas),
            _ => Err(ServiceError::not_found("Canvas", canvas_id)),
        }
    }

    pub async fn list_canvases(&self, user_id: &str) -> Result<Vec<Canvas>, ServiceError> {
        Ok(self.db.db_list_canvases(user_id).await?)
    }

    /// The caller's folders, ordered by name
    pub async fn list_folders(&self, user_id: &str) -> Result<Vec<Folder>, ServiceError> {
        Ok(self.db.db_list_folders(user_id).await?)
    }

    pub async fn create_folder(&self, user_id: &str, name: &str) -> Result<Folder, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::invalid_input("Folder name is required"));
        }

        let folder = Folder {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.db.db_create_folder(&folder).await?;
        Ok(folder)
    }
}
