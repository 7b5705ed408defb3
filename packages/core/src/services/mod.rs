//! Business Services
//!
//! This module contains the core business logic services:
//!
//! - `CanvasService` - canvas creation, ownership checks and folder listing
//! - `GraphService` - node/edge graph load, save and edge deletion
//! - `SettingsService` - per-user provider API key
//! - `SessionService` - session tokens for the auth boundary
//! - [`migrations`] - operator-run data and schema migrations
//!
//! Services coordinate between the database layer and the HTTP surface,
//! implementing ownership and validation rules.

pub mod canvas_service;
pub mod error;
pub mod graph_service;
pub mod migrations;
pub mod session_service;
pub mod settings_service;

pub use canvas_service::{canvas_path, CanvasService, CreatedCanvas};
pub use error::ServiceError;
pub use graph_service::GraphService;
pub use session_service::SessionService;
pub use settings_service::{ApiKeyStatus, SettingsService};
