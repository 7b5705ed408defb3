//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - Canvas, folder and graph (node/edge) persistence
//! - Profiles, per-user settings and sessions
//! - Store traits used by data migrations
//!
//! # Architecture
//!
//! MindGrid keeps one embedded SQLite-compatible database file. Node
//! `style`/`data` and edge `data` are stored as JSON text so new editor
//! fields never need a schema change.

mod account_queries;
mod canvas_queries;
mod database;
mod error;
mod node_store;

pub use canvas_queries::{GraphWriteSummary, UndecodableNode};
pub use database::DatabaseService;
pub use error::DatabaseError;
pub use node_store::{NodeStore, SqlExecutor};
