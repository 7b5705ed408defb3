//! Data Models
//!
//! This module contains the core data structures used throughout MindGrid:
//!
//! - `CanvasNode` / `NodeType` - visual elements placed on a canvas
//! - `CanvasEdge` / `EdgeData` - directed, handle-aware connections
//! - `Canvas`, `Folder`, `Profile`, `Session` - ownership and auth records
//!
//! Node `style` and `data` are free-form JSON, stored as JSON text in the
//! `nodes` table.

mod canvas;
mod edge;
mod node;

pub use canvas::{Canvas, CanvasGraph, Folder, NewCanvas, Profile, Session};
pub use edge::{CanvasEdge, EdgeData};
pub use node::{CanvasNode, NodeType, Position, ValidationError};
