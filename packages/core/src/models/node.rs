//! Canvas Node Data Structures
//!
//! A node is a visual element placed on a canvas. Every node carries a
//! semantic `type`, a position, a `style` object (width/height plus any
//! renderer keys) and a free-form `data` payload.
//!
//! # Examples
//!
//! ```rust
//! use mindgrid_core::models::{CanvasNode, NodeType};
//! use serde_json::json;
//!
//! let node = CanvasNode::new("canvas-1", NodeType::Text, json!({"label": "Idea"}));
//! assert_eq!(node.node_type, NodeType::Text);
//! assert_eq!(node.data["label"], "Idea");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for canvas models
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid node type: {0}")]
    InvalidNodeType(String),

    #[error("Edge {edge_id} references unknown node {node_id}")]
    DanglingEdge { edge_id: String, node_id: String },

    #[error("Duplicate id in payload: {0}")]
    DuplicateId(String),
}

/// Semantic node types accepted on a canvas.
///
/// Serialized in kebab-case (`ai-response`), which is also the value stored
/// in the `nodes.type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Text,
    Image,
    Video,
    File,
    Link,
    AiResponse,
    Headline,
    Sticky,
    Emoji,
    Group,
    Synapse,
}

impl NodeType {
    /// Every type, in allow-list order
    pub const ALL: [NodeType; 11] = [
        NodeType::Text,
        NodeType::Image,
        NodeType::Video,
        NodeType::File,
        NodeType::Link,
        NodeType::AiResponse,
        NodeType::Headline,
        NodeType::Sticky,
        NodeType::Emoji,
        NodeType::Group,
        NodeType::Synapse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Text => "text",
            NodeType::Image => "image",
            NodeType::Video => "video",
            NodeType::File => "file",
            NodeType::Link => "link",
            NodeType::AiResponse => "ai-response",
            NodeType::Headline => "headline",
            NodeType::Sticky => "sticky",
            NodeType::Emoji => "emoji",
            NodeType::Group => "group",
            NodeType::Synapse => "synapse",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidNodeType(s.to_string()))
    }
}

/// Canvas coordinates of a node's top-left corner
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

fn empty_object() -> Value {
    json!({})
}

/// A node placed on a canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasNode {
    pub id: String,

    /// Owning canvas. Graph payloads may omit it; the graph service fills it in.
    #[serde(default)]
    pub canvas_id: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    #[serde(default)]
    pub position: Position,

    /// Visual style (width, height, ...). Replaced wholesale on update.
    #[serde(default = "empty_object")]
    pub style: Value,

    /// Free-form payload (`label`, `emoji`, text content, image url, ...)
    #[serde(default = "empty_object")]
    pub data: Value,
}

impl CanvasNode {
    /// Create a node with a fresh UUID, origin position and empty style
    pub fn new(canvas_id: impl Into<String>, node_type: NodeType, data: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            canvas_id: canvas_id.into(),
            node_type,
            position: Position::default(),
            style: empty_object(),
            data,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_style(mut self, style: Value) -> Self {
        self.style = style;
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }

    /// String label from `data.label`, if present
    pub fn label(&self) -> Option<&str> {
        self.data.get("label").and_then(Value::as_str)
    }
}
