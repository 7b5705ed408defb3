//! MindGrid Core Business Logic Layer
//!
//! This crate provides data management, migrations, AI generation and
//! object storage for the MindGrid mind-mapping canvas.
//!
//! # Architecture
//!
//! - **libsql**: Embedded SQLite-compatible database file
//! - **JSON payloads**: Node `style`/`data` and edge `data` stored as JSON text
//! - **Per-user keys**: Generation calls use the caller's own provider key
//!
//! # Modules
//!
//! - [`models`] - Data structures (CanvasNode, CanvasEdge, Canvas, ...)
//! - [`services`] - Business services and migrations
//! - [`db`] - Database layer with libsql integration
//! - [`ai`] - OpenAI-compatible generation client
//! - [`storage`] - Durable object storage for generated files

pub mod ai;
pub mod db;
pub mod models;
pub mod services;
pub mod storage;

// Re-export commonly used types
pub use models::*;
pub use services::*;
