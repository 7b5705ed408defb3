//! Store seams used by data migrations
//!
//! Migrations talk to the database through these traits rather than to
//! [`DatabaseService`] directly, so a migration run can be exercised against
//! a store that fails on chosen rows.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mindgrid_core::db::{DatabaseService, NodeStore};
//! use mindgrid_core::models::NodeType;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = DatabaseService::new(PathBuf::from("./data/mindgrid.db")).await?;
//!     let store: &dyn NodeStore = &db;
//!     let emoji_rows = store.nodes_of_type(NodeType::Emoji).await?;
//!     println!("{} emoji nodes", emoji_rows.len());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;

use crate::db::{DatabaseError, DatabaseService, UndecodableNode};
use crate::models::{CanvasNode, NodeType};

/// Row-level node access
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// All nodes whose `type` column equals `node_type`, decoded per row
    async fn nodes_of_type(
        &self,
        node_type: NodeType,
    ) -> Result<Vec<Result<CanvasNode, UndecodableNode>>, DatabaseError>;

    /// Overwrite `type`, `style` and `data` of one node
    ///
    /// # Errors
    ///
    /// Fails if the statement fails or no row with `node.id` exists.
    async fn update_node(&self, node: &CanvasNode) -> Result<(), DatabaseError>;
}

/// Raw SQL execution for schema changes
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<(), DatabaseError>;
}

#[async_trait]
impl NodeStore for DatabaseService {
    async fn nodes_of_type(
        &self,
        node_type: NodeType,
    ) -> Result<Vec<Result<CanvasNode, UndecodableNode>>, DatabaseError> {
        self.db_nodes_of_type(node_type).await
    }

    async fn update_node(&self, node: &CanvasNode) -> Result<(), DatabaseError> {
        let changed = self.db_update_node_shape(node).await?;
        if changed == 0 {
            return Err(DatabaseError::sql_execution(format!(
                "Node {} not found",
                node.id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SqlExecutor for DatabaseService {
    async fn execute(&self, sql: &str) -> Result<(), DatabaseError> {
        self.execute_sql(sql).await.map(|_| ())
    }
}
