//! Canvas Edge Data Structures
//!
//! An edge is a directed connection between two nodes of the same canvas.
//! `sourceHandle` / `targetHandle` name the connection points on each end;
//! they are stored exactly as received so the editor reattaches the edge to
//! the same handles after a reload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

fn default_edge_type() -> String {
    "default".to_string()
}

/// Visual and behavioural customization of an edge.
///
/// Known keys are typed; anything else the editor sends is preserved in
/// `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// `forward`, `reverse`, `bidirectional` or `none`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_direction: Option<String>,

    /// Animation speed multiplier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasEdge {
    pub id: String,

    #[serde(default)]
    pub canvas_id: String,

    pub source: String,
    pub target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,

    #[serde(rename = "type", default = "default_edge_type")]
    pub edge_type: String,

    #[serde(default)]
    pub data: EdgeData,
}

impl CanvasEdge {
    pub fn new(
        canvas_id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            canvas_id: canvas_id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            edge_type: default_edge_type(),
            data: EdgeData::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_handles(
        mut self,
        source_handle: Option<&str>,
        target_handle: Option<&str>,
    ) -> Self {
        self.source_handle = source_handle.map(str::to_string);
        self.target_handle = target_handle.map(str::to_string);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_edge_keeps_unknown_data_keys() {
        let edge: CanvasEdge = serde_json::from_value(json!({
            "id": "e1",
            "source": "a",
            "target": "b",
            "sourceHandle": "right",
            "data": {"color": "#ff0000", "speed": 1.5, "animated": true}
        }))
        .unwrap();

        assert_eq!(edge.source_handle.as_deref(), Some("right"));
        assert_eq!(edge.target_handle, None);
        assert_eq!(edge.edge_type, "default");
        assert_eq!(edge.data.color.as_deref(), Some("#ff0000"));
        assert_eq!(edge.data.extra.get("animated"), Some(&json!(true)));

        let back = serde_json::to_value(&edge).unwrap();
        assert_eq!(back["data"]["animated"], json!(true));
        assert!(back.get("targetHandle").is_none());
    }
}
