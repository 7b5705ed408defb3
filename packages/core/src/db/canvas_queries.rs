//! Canvas, folder and graph SQL
//!
//! Raw SQL for canvases and their node/edge graph. Services wrap these with
//! validation and ownership checks; nothing here knows about users beyond
//! the `user_id` column.

use std::collections::HashSet;

use chrono::Utc;
use libsql::Row;
use serde_json::Value;

use crate::db::database::parse_timestamp;
use crate::db::{DatabaseError, DatabaseService};
use crate::models::{
    Canvas, CanvasEdge, CanvasGraph, CanvasNode, EdgeData, Folder, NodeType, Position,
};

const NODE_COLUMNS: &str = "id, canvas_id, type, position_x, position_y, style, data";
const EDGE_COLUMNS: &str =
    "id, canvas_id, source, target, source_handle, target_handle, type, data";
const CANVAS_COLUMNS: &str =
    "id, name, description, user_id, organization_id, folder_id, created_at, updated_at";

/// A stored node row whose columns could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndecodableNode {
    pub canvas_id: String,
    pub id: String,
    pub reason: String,
}

/// Counts reported by [`DatabaseService::db_replace_graph`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphWriteSummary {
    pub nodes_written: usize,
    pub nodes_deleted: usize,
    pub edges_written: usize,
    pub edges_deleted: usize,
    /// Edges in the payload that were dropped because they had been deleted
    pub edges_skipped: usize,
}

fn json_column(row: &Row, idx: i32, table: &str, column: &str) -> Result<Value, DatabaseError> {
    let raw: String = row
        .get(idx)
        .map_err(|e| DatabaseError::invalid_row(table, format!("{}: {}", column, e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| DatabaseError::invalid_row(table, format!("{} is not JSON: {}", column, e)))
}

pub(crate) fn row_to_node(row: &Row) -> Result<CanvasNode, DatabaseError> {
    let get_err = |column: &str, e: libsql::Error| {
        DatabaseError::invalid_row("nodes", format!("{}: {}", column, e))
    };

    let id: String = row.get(0).map_err(|e| get_err("id", e))?;
    let canvas_id: String = row.get(1).map_err(|e| get_err("canvas_id", e))?;
    let node_type: String = row.get(2).map_err(|e| get_err("type", e))?;
    let x: f64 = row.get(3).map_err(|e| get_err("position_x", e))?;
    let y: f64 = row.get(4).map_err(|e| get_err("position_y", e))?;

    let node_type = node_type
        .parse::<NodeType>()
        .map_err(|e| DatabaseError::invalid_row("nodes", format!("{} ({})", e, id)))?;

    Ok(CanvasNode {
        id,
        canvas_id,
        node_type,
        position: Position { x, y },
        style: json_column(row, 5, "nodes", "style")?,
        data: json_column(row, 6, "nodes", "data")?,
    })
}

fn row_to_edge(row: &Row) -> Result<CanvasEdge, DatabaseError> {
    let get_err = |column: &str, e: libsql::Error| {
        DatabaseError::invalid_row("edges", format!("{}: {}", column, e))
    };

    let data = json_column(row, 7, "edges", "data")?;
    let data: EdgeData = serde_json::from_value(data)
        .map_err(|e| DatabaseError::invalid_row("edges", format!("data: {}", e)))?;

    Ok(CanvasEdge {
        id: row.get(0).map_err(|e| get_err("id", e))?,
        canvas_id: row.get(1).map_err(|e| get_err("canvas_id", e))?,
        source: row.get(2).map_err(|e| get_err("source", e))?,
        target: row.get(3).map_err(|e| get_err("target", e))?,
        source_handle: row.get(4).map_err(|e| get_err("source_handle", e))?,
        target_handle: row.get(5).map_err(|e| get_err("target_handle", e))?,
        edge_type: row.get(6).map_err(|e| get_err("type", e))?,
        data,
    })
}

fn row_to_canvas(row: &Row) -> Result<Canvas, DatabaseError> {
    let get_err = |column: &str, e: libsql::Error| {
        DatabaseError::invalid_row("canvases", format!("{}: {}", column, e))
    };

    let created_at: String = row.get(6).map_err(|e| get_err("created_at", e))?;
    let updated_at: String = row.get(7).map_err(|e| get_err("updated_at", e))?;

    Ok(Canvas {
        id: row.get(0).map_err(|e| get_err("id", e))?,
        name: row.get(1).map_err(|e| get_err("name", e))?,
        description: row.get(2).map_err(|e| get_err("description", e))?,
        user_id: row.get(3).map_err(|e| get_err("user_id", e))?,
        organization_id: row.get(4).map_err(|e| get_err("organization_id", e))?,
        folder_id: row.get(5).map_err(|e| get_err("folder_id", e))?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn row_to_folder(row: &Row) -> Result<Folder, DatabaseError> {
    let get_err = |column: &str, e: libsql::Error| {
        DatabaseError::invalid_row("folders", format!("{}: {}", column, e))
    };
    let created_at: String = row.get(3).map_err(|e| get_err("created_at", e))?;

    Ok(Folder {
        id: row.get(0).map_err(|e| get_err("id", e))?,
        user_id: row.get(1).map_err(|e| get_err("user_id", e))?,
        name: row.get(2).map_err(|e| get_err("name", e))?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn to_json_text(value: &impl serde::Serialize, what: &str) -> Result<String, DatabaseError> {
    serde_json::to_string(value)
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to serialize {}: {}", what, e)))
}

async fn upsert_node(conn: &libsql::Connection, node: &CanvasNode) -> Result<(), DatabaseError> {
    let style = to_json_text(&node.style, "node style")?;
    let data = to_json_text(&node.data, "node data")?;
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO nodes (id, canvas_id, type, position_x, position_y, style, data, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(canvas_id, id) DO UPDATE SET
            type = excluded.type,
            position_x = excluded.position_x,
            position_y = excluded.position_y,
            style = excluded.style,
            data = excluded.data,
            updated_at = excluded.updated_at",
        (
            node.id.as_str(),
            node.canvas_id.as_str(),
            node.node_type.as_str(),
            node.position.x,
            node.position.y,
            style,
            data,
            now.as_str(),
            now.as_str(),
        ),
    )
    .await
    .map_err(|e| DatabaseError::from_query(&format!("upsert node {}", node.id), e))?;

    Ok(())
}

async fn upsert_edge(conn: &libsql::Connection, edge: &CanvasEdge) -> Result<(), DatabaseError> {
    let data = to_json_text(&edge.data, "edge data")?;
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO edges (id, canvas_id, source, target, source_handle, target_handle, type, data, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(canvas_id, id) DO UPDATE SET
            source = excluded.source,
            target = excluded.target,
            source_handle = excluded.source_handle,
            target_handle = excluded.target_handle,
            type = excluded.type,
            data = excluded.data,
            updated_at = excluded.updated_at",
        (
            edge.id.as_str(),
            edge.canvas_id.as_str(),
            edge.source.as_str(),
            edge.target.as_str(),
            edge.source_handle.as_deref(),
            edge.target_handle.as_deref(),
            edge.edge_type.as_str(),
            data,
            now.as_str(),
            now.as_str(),
        ),
    )
    .await
    .map_err(|e| DatabaseError::from_query(&format!("upsert edge {}", edge.id), e))?;

    Ok(())
}

async fn collect_ids(
    conn: &libsql::Connection,
    sql: &str,
    canvas_id: &str,
) -> Result<HashSet<String>, DatabaseError> {
    let mut rows = conn
        .query(sql, [canvas_id])
        .await
        .map_err(|e| DatabaseError::from_query("collect ids", e))?;

    let mut ids = HashSet::new();
    while let Some(row) = rows.next().await? {
        let id: String = row.get(0)?;
        ids.insert(id);
    }
    Ok(ids)
}

impl DatabaseService {
    //
    // CANVASES
    //

    pub async fn db_create_canvas(&self, canvas: &Canvas) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            &format!("INSERT INTO canvases ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)", CANVAS_COLUMNS),
            (
                canvas.id.as_str(),
                canvas.name.as_str(),
                canvas.description.as_deref(),
                canvas.user_id.as_str(),
                canvas.organization_id.as_deref(),
                canvas.folder_id.as_deref(),
                canvas.created_at.to_rfc3339(),
                canvas.updated_at.to_rfc3339(),
            ),
        )
        .await
        .map_err(|e| DatabaseError::from_query("insert canvas", e))?;

        Ok(())
    }

    pub async fn db_get_canvas(&self, id: &str) -> Result<Option<Canvas>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                &format!("SELECT {} FROM canvases WHERE id = ?", CANVAS_COLUMNS),
                [id],
            )
            .await
            .map_err(|e| DatabaseError::from_query("get canvas", e))?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_canvas(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn db_list_canvases(&self, user_id: &str) -> Result<Vec<Canvas>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM canvases WHERE user_id = ? ORDER BY updated_at DESC",
                    CANVAS_COLUMNS
                ),
                [user_id],
            )
            .await
            .map_err(|e| DatabaseError::from_query("list canvases", e))?;

        let mut canvases = Vec::new();
        while let Some(row) = rows.next().await? {
            canvases.push(row_to_canvas(&row)?);
        }
        Ok(canvases)
    }

    //
    // FOLDERS
    //

    pub async fn db_create_folder(&self, folder: &Folder) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO folders (id, user_id, name, created_at) VALUES (?, ?, ?, ?)",
            (
                folder.id.as_str(),
                folder.user_id.as_str(),
                folder.name.as_str(),
                folder.created_at.to_rfc3339(),
            ),
        )
        .await
        .map_err(|e| DatabaseError::from_query("insert folder", e))?;

        Ok(())
    }

    pub async fn db_get_folder(&self, id: &str) -> Result<Option<Folder>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                "SELECT id, user_id, name, created_at FROM folders WHERE id = ?",
                [id],
            )
            .await
            .map_err(|e| DatabaseError::from_query("get folder", e))?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_folder(&row)?)),
            None => Ok(None),
        }
    }

    /// Folders owned by `user_id`, ordered by name
    pub async fn db_list_folders(&self, user_id: &str) -> Result<Vec<Folder>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                "SELECT id, user_id, name, created_at FROM folders WHERE user_id = ? ORDER BY name ASC",
                [user_id],
            )
            .await
            .map_err(|e| DatabaseError::from_query("list folders", e))?;

        let mut folders = Vec::new();
        while let Some(row) = rows.next().await? {
            folders.push(row_to_folder(&row)?);
        }
        Ok(folders)
    }

    //
    // NODES
    //

    pub async fn db_insert_node(&self, node: &CanvasNode) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        upsert_node(&conn, node).await
    }

    pub async fn db_get_node(
        &self,
        canvas_id: &str,
        id: &str,
    ) -> Result<Option<CanvasNode>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                &format!("SELECT {} FROM nodes WHERE canvas_id = ? AND id = ?", NODE_COLUMNS),
                [canvas_id, id],
            )
            .await
            .map_err(|e| DatabaseError::from_query("get node", e))?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    /// All nodes of one type, across every canvas
    ///
    /// Each row is decoded on its own; a row with corrupt `style`/`data` is
    /// returned as an [`UndecodableNode`] instead of failing the whole read.
    pub async fn db_nodes_of_type(
        &self,
        node_type: NodeType,
    ) -> Result<Vec<Result<CanvasNode, UndecodableNode>>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM nodes WHERE type = ? ORDER BY canvas_id, id",
                    NODE_COLUMNS
                ),
                [node_type.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::from_query("select nodes by type", e))?;

        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await? {
            let decoded = row_to_node(&row).map_err(|e| UndecodableNode {
                canvas_id: row.get::<String>(1).unwrap_or_default(),
                id: row.get::<String>(0).unwrap_or_default(),
                reason: e.to_string(),
            });
            nodes.push(decoded);
        }
        Ok(nodes)
    }

    /// Overwrite `type`, `style` and `data` of an existing node
    ///
    /// Returns the number of rows changed (0 when the node does not exist).
    pub async fn db_update_node_shape(&self, node: &CanvasNode) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let style = to_json_text(&node.style, "node style")?;
        let data = to_json_text(&node.data, "node data")?;

        conn.execute(
            "UPDATE nodes SET type = ?, style = ?, data = ?, updated_at = ?
             WHERE canvas_id = ? AND id = ?",
            (
                node.node_type.as_str(),
                style,
                data,
                Utc::now().to_rfc3339(),
                node.canvas_id.as_str(),
                node.id.as_str(),
            ),
        )
        .await
        .map_err(|e| DatabaseError::from_query(&format!("update node {}", node.id), e))
    }

    //
    // GRAPH
    //

    pub async fn db_get_graph(&self, canvas_id: &str) -> Result<CanvasGraph, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM nodes WHERE canvas_id = ? ORDER BY created_at, id",
                    NODE_COLUMNS
                ),
                [canvas_id],
            )
            .await
            .map_err(|e| DatabaseError::from_query("load canvas nodes", e))?;

        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await? {
            nodes.push(row_to_node(&row)?);
        }

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM edges WHERE canvas_id = ? ORDER BY created_at, id",
                    EDGE_COLUMNS
                ),
                [canvas_id],
            )
            .await
            .map_err(|e| DatabaseError::from_query("load canvas edges", e))?;

        let mut edges = Vec::new();
        while let Some(row) = rows.next().await? {
            edges.push(row_to_edge(&row)?);
        }

        Ok(CanvasGraph { nodes, edges })
    }

    /// Replace the stored graph of a canvas with `graph`
    ///
    /// Runs in one transaction: edges and nodes absent from `graph` are
    /// deleted, everything present is upserted.
    ///
    /// Tombstoned edge ids in `graph` are skipped. A tombstone whose id is
    /// absent from `graph` is released, so a client that reconnects the same
    /// handles later (editors derive edge ids from endpoints) can save it.
    ///
    /// All validations (node types, edge endpoints, canvas ids) must be done
    /// BEFORE calling this method.
    pub async fn db_replace_graph(
        &self,
        canvas_id: &str,
        graph: &CanvasGraph,
    ) -> Result<GraphWriteSummary, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("BEGIN TRANSACTION", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
        })?;

        match Self::write_graph(&conn, canvas_id, graph).await {
            Ok(summary) => {
                if let Err(e) = conn.execute("COMMIT", ()).await {
                    let _rollback = conn.execute("ROLLBACK", ()).await;
                    return Err(DatabaseError::sql_execution(format!(
                        "Failed to commit transaction: {}",
                        e
                    )));
                }
                Ok(summary)
            }
            Err(e) => {
                let _rollback = conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    async fn write_graph(
        conn: &libsql::Connection,
        canvas_id: &str,
        graph: &CanvasGraph,
    ) -> Result<GraphWriteSummary, DatabaseError> {
        let mut summary = GraphWriteSummary::default();

        let tombstones = collect_ids(
            conn,
            "SELECT edge_id FROM edge_tombstones WHERE canvas_id = ?",
            canvas_id,
        )
        .await?;
        let existing_edges =
            collect_ids(conn, "SELECT id FROM edges WHERE canvas_id = ?", canvas_id).await?;
        let existing_nodes =
            collect_ids(conn, "SELECT id FROM nodes WHERE canvas_id = ?", canvas_id).await?;

        let wanted_edges: HashSet<&str> = graph.edges.iter().map(|e| e.id.as_str()).collect();
        let wanted_nodes: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();

        // A payload without the edge has seen the deletion; from here on the id
        // names a new connection.
        let mut blocked = HashSet::new();
        for id in tombstones {
            if wanted_edges.contains(id.as_str()) {
                blocked.insert(id);
            } else {
                conn.execute(
                    "DELETE FROM edge_tombstones WHERE canvas_id = ? AND edge_id = ?",
                    [canvas_id, id.as_str()],
                )
                .await
                .map_err(|e| DatabaseError::from_query("release edge tombstone", e))?;
            }
        }

        for id in existing_edges.iter().filter(|id| !wanted_edges.contains(id.as_str())) {
            conn.execute(
                "DELETE FROM edges WHERE canvas_id = ? AND id = ?",
                [canvas_id, id.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::from_query("delete edge", e))?;
            summary.edges_deleted += 1;
        }

        for node in &graph.nodes {
            upsert_node(conn, node).await?;
            summary.nodes_written += 1;
        }

        for id in existing_nodes.iter().filter(|id| !wanted_nodes.contains(id.as_str())) {
            conn.execute(
                "DELETE FROM nodes WHERE canvas_id = ? AND id = ?",
                [canvas_id, id.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::from_query("delete node", e))?;
            summary.nodes_deleted += 1;
        }

        for edge in &graph.edges {
            if blocked.contains(&edge.id) {
                summary.edges_skipped += 1;
                continue;
            }
            upsert_edge(conn, edge).await?;
            summary.edges_written += 1;
        }

        Ok(summary)
    }

    /// Permanently delete an edge
    ///
    /// A tombstone is recorded even if the row is already gone, so a client
    /// still holding the edge cannot write it back. The tombstone lasts until
    /// a save that omits the edge. Returns whether a stored row was removed.
    pub async fn db_delete_edge(
        &self,
        canvas_id: &str,
        edge_id: &str,
    ) -> Result<bool, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let deleted = conn
            .execute(
                "DELETE FROM edges WHERE id = ? AND canvas_id = ?",
                [edge_id, canvas_id],
            )
            .await
            .map_err(|e| DatabaseError::from_query("delete edge", e))?;

        conn.execute(
            "INSERT OR IGNORE INTO edge_tombstones (canvas_id, edge_id, deleted_at) VALUES (?, ?, ?)",
            (canvas_id, edge_id, Utc::now().to_rfc3339()),
        )
        .await
        .map_err(|e| DatabaseError::from_query("record edge tombstone", e))?;

        Ok(deleted > 0)
    }
}
