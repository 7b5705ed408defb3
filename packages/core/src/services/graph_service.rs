//! Graph Service
//!
//! Loads and saves the node/edge graph of a canvas. A save validates the
//! whole payload before anything is written:
//!
//! - node and edge ids are unique within the payload
//! - every edge endpoint names a node in the same payload
//!
//! Node types are checked while the payload is decoded (see
//! [`GraphService::decode_graph`]), so an unknown type never reaches SQL.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::db::{DatabaseService, GraphWriteSummary};
use crate::models::{CanvasGraph, NodeType, ValidationError};
use crate::services::{CanvasService, ServiceError};

pub struct GraphService {
    db: Arc<DatabaseService>,
    canvases: Arc<CanvasService>,
}

/// Check ids and edge endpoints of a graph payload
pub fn validate_graph(graph: &CanvasGraph) -> Result<(), ValidationError> {
    let mut node_ids = HashSet::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        if node.id.is_empty() {
            return Err(ValidationError::MissingField("node.id".to_string()));
        }
        if !node_ids.insert(node.id.as_str()) {
            return Err(ValidationError::DuplicateId(node.id.clone()));
        }
    }

    let mut edge_ids = HashSet::with_capacity(graph.edges.len());
    for edge in &graph.edges {
        if edge.id.is_empty() {
            return Err(ValidationError::MissingField("edge.id".to_string()));
        }
        if !edge_ids.insert(edge.id.as_str()) {
            return Err(ValidationError::DuplicateId(edge.id.clone()));
        }
        for endpoint in [&edge.source, &edge.target] {
            if !node_ids.contains(endpoint.as_str()) {
                return Err(ValidationError::DanglingEdge {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
    }

    Ok(())
}

impl GraphService {
    pub fn new(db: Arc<DatabaseService>, canvases: Arc<CanvasService>) -> Self {
        Self { db, canvases }
    }

    /// Decode a raw JSON graph payload
    ///
    /// An unknown node `type` is reported as
    /// [`ValidationError::InvalidNodeType`] rather than a generic decode
    /// error.
    pub fn decode_graph(payload: Value) -> Result<CanvasGraph, ServiceError> {
        if let Some(nodes) = payload.get("nodes").and_then(Value::as_array) {
            for node in nodes {
                match node.get("type").and_then(Value::as_str) {
                    Some(t) => {
                        t.parse::<NodeType>()?;
                    }
                    None => {
                        return Err(ValidationError::MissingField("node.type".to_string()).into())
                    }
                }
            }
        }

        serde_json::from_value(payload)
            .map_err(|e| ServiceError::invalid_input(format!("Invalid graph payload: {}", e)))
    }

    /// Stored graph of a canvas owned by `user_id`
    pub async fn load_graph(
        &self,
        user_id: &str,
        canvas_id: &str,
    ) -> Result<CanvasGraph, ServiceError> {
        self.canvases.get_owned_canvas(user_id, canvas_id).await?;
        Ok(self.db.db_get_graph(canvas_id).await?)
    }

    /// Replace the stored graph of a canvas owned by `user_id`
    ///
    /// `canvas_id` on every node and edge is set to the target canvas
    /// regardless of what the payload carried.
    pub async fn save_graph(
        &self,
        user_id: &str,
        canvas_id: &str,
        mut graph: CanvasGraph,
    ) -> Result<GraphWriteSummary, ServiceError> {
        self.canvases.get_owned_canvas(user_id, canvas_id).await?;
        validate_graph(&graph)?;

        for node in &mut graph.nodes {
            node.canvas_id = canvas_id.to_string();
        }
        for edge in &mut graph.edges {
            edge.canvas_id = canvas_id.to_string();
        }

        let summary = self.db.db_replace_graph(canvas_id, &graph).await?;

        if summary.edges_skipped > 0 {
            debug!(
                canvas_id,
                skipped = summary.edges_skipped,
                "ignored previously deleted edges in save"
            );
        }
        info!(
            canvas_id,
            nodes = summary.nodes_written,
            edges = summary.edges_written,
            "canvas graph saved"
        );

        Ok(summary)
    }

    /// Permanently delete one edge of a canvas owned by `user_id`
    ///
    /// Deleting an edge that is already gone succeeds; the id stays
    /// retired either way.
    pub async fn delete_edge(
        &self,
        user_id: &str,
        canvas_id: &str,
        edge_id: &str,
    ) -> Result<bool, ServiceError> {
        self.canvases.get_owned_canvas(user_id, canvas_id).await?;
        let removed = self.db.db_delete_edge(canvas_id, edge_id).await?;
        info!(canvas_id, edge_id, removed, "edge deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CanvasEdge, CanvasNode, NewCanvas};
    use serde_json::json;
    use tempfile::TempDir;

    struct TestEnv {
        graphs: GraphService,
        canvases: Arc<CanvasService>,
        canvas_id: String,
        _temp_dir: TempDir,
    }

    async fn create_test_env() -> anyhow::Result<TestEnv> {
        let temp_dir = TempDir::new()?;
        let db = Arc::new(DatabaseService::new(temp_dir.path().join("graph.db")).await?);
        let canvases = Arc::new(CanvasService::new(db.clone()));
        let created = canvases
            .create_canvas(
                "u1",
                NewCanvas {
                    name: "Board".to_string(),
                    ..Default::default()
                },
            )
            .await?;

        Ok(TestEnv {
            graphs: GraphService::new(db, canvases.clone()),
            canvases,
            canvas_id: created.canvas.id,
            _temp_dir: temp_dir,
        })
    }

    fn two_nodes_and_edge(canvas_id: &str) -> CanvasGraph {
        let a = CanvasNode::new(canvas_id, NodeType::Text, json!({"label": "A"})).with_id("a");
        let b =
            CanvasNode::new(canvas_id, NodeType::Synapse, json!({"emoji": "🧠"})).with_id("b");
        let edge = CanvasEdge::new(canvas_id, "a", "b")
            .with_id("e1")
            .with_handles(Some("right"), Some("left"));
        CanvasGraph {
            nodes: vec![a, b],
            edges: vec![edge],
        }
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let mut graph = two_nodes_and_edge("c1");
        graph.edges[0].target = "ghost".to_string();

        let err = validate_graph(&graph).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DanglingEdge {
                edge_id: "e1".to_string(),
                node_id: "ghost".to_string()
            }
        );
    }

    #[test]
    fn test_decode_reports_unknown_node_type() {
        let payload = json!({
            "nodes": [{"id": "n1", "type": "widget", "position": {"x": 0, "y": 0}}],
            "edges": []
        });

        let err = GraphService::decode_graph(payload).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::InvalidNodeType(ref t)) if t == "widget"
        ));
    }

    #[tokio::test]
    async fn test_save_and_reload_keeps_handles() -> anyhow::Result<()> {
        let env = create_test_env().await?;

        let summary = env
            .graphs
            .save_graph("u1", &env.canvas_id, two_nodes_and_edge(&env.canvas_id))
            .await?;
        assert_eq!(summary.nodes_written, 2);
        assert_eq!(summary.edges_written, 1);

        let graph = env.graphs.load_graph("u1", &env.canvas_id).await?;
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges[0].source_handle.as_deref(), Some("right"));
        assert_eq!(graph.edges[0].target_handle.as_deref(), Some("left"));
        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_edge_stays_deleted_after_stale_save() -> anyhow::Result<()> {
        let env = create_test_env().await?;
        let graph = two_nodes_and_edge(&env.canvas_id);
        env.graphs.save_graph("u1", &env.canvas_id, graph.clone()).await?;

        assert!(env.graphs.delete_edge("u1", &env.canvas_id, "e1").await?);

        // A client that never saw the delete saves its old copy
        let summary = env.graphs.save_graph("u1", &env.canvas_id, graph).await?;
        assert_eq!(summary.edges_skipped, 1);

        let reloaded = env.graphs.load_graph("u1", &env.canvas_id).await?;
        assert!(reloaded.edges.is_empty());
        assert_eq!(reloaded.nodes.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_removes_nodes_missing_from_payload() -> anyhow::Result<()> {
        let env = create_test_env().await?;
        env.graphs
            .save_graph("u1", &env.canvas_id, two_nodes_and_edge(&env.canvas_id))
            .await?;

        let mut smaller = two_nodes_and_edge(&env.canvas_id);
        smaller.nodes.truncate(1);
        smaller.edges.clear();
        let summary = env.graphs.save_graph("u1", &env.canvas_id, smaller).await?;
        assert_eq!(summary.nodes_deleted, 1);
        assert_eq!(summary.edges_deleted, 1);

        let graph = env.graphs.load_graph("u1", &env.canvas_id).await?;
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, "a");
        Ok(())
    }

    #[tokio::test]
    async fn test_other_user_cannot_read_graph() -> anyhow::Result<()> {
        let env = create_test_env().await?;
        let err = env.graphs.load_graph("u2", &env.canvas_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_canvases_may_reuse_node_and_edge_ids() -> anyhow::Result<()> {
        let env = create_test_env().await?;
        let other = env
            .canvases
            .create_canvas(
                "u2",
                NewCanvas {
                    name: "Elsewhere".to_string(),
                    ..Default::default()
                },
            )
            .await?
            .canvas
            .id;

        env.graphs
            .save_graph("u1", &env.canvas_id, two_nodes_and_edge(&env.canvas_id))
            .await?;
        let summary = env
            .graphs
            .save_graph("u2", &other, two_nodes_and_edge(&other))
            .await?;
        assert_eq!(summary.nodes_written, 2);
        assert_eq!(summary.edges_written, 1);

        let theirs = env.graphs.load_graph("u2", &other).await?;
        assert_eq!(theirs.nodes.len(), 2);
        assert_eq!(theirs.edges.len(), 1);
        assert!(theirs.nodes.iter().all(|n| n.canvas_id == other));

        // Emptying one canvas leaves the other untouched
        env.graphs
            .save_graph("u2", &other, CanvasGraph::default())
            .await?;
        let mine = env.graphs.load_graph("u1", &env.canvas_id).await?;
        assert_eq!(mine.nodes.len(), 2);
        assert_eq!(mine.edges.len(), 1);

        // Deleting an edge is scoped to its canvas
        env.graphs
            .save_graph("u2", &other, two_nodes_and_edge(&other))
            .await?;
        env.graphs.delete_edge("u2", &other, "e1").await?;
        let mine = env.graphs.load_graph("u1", &env.canvas_id).await?;
        assert_eq!(mine.edges.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_reconnected_edge_saves_after_deletion_acknowledged() -> anyhow::Result<()> {
        let env = create_test_env().await?;
        let graph = two_nodes_and_edge(&env.canvas_id);
        env.graphs.save_graph("u1", &env.canvas_id, graph.clone()).await?;
        env.graphs.delete_edge("u1", &env.canvas_id, "e1").await?;

        // The deleting client saves without the edge
        let mut without_edge = graph.clone();
        without_edge.edges.clear();
        env.graphs
            .save_graph("u1", &env.canvas_id, without_edge)
            .await?;

        // Reconnecting the same handles yields the same id
        let summary = env.graphs.save_graph("u1", &env.canvas_id, graph).await?;
        assert_eq!(summary.edges_skipped, 0);
        assert_eq!(summary.edges_written, 1);

        let reloaded = env.graphs.load_graph("u1", &env.canvas_id).await?;
        assert_eq!(reloaded.edges.len(), 1);
        Ok(())
    }
}
