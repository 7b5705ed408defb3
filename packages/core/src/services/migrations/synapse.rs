//! Emoji → Synapse Node Migration
//!
//! The `emoji` node type was repurposed as `synapse`. Every `emoji` row is
//! rewritten with:
//!
//! - `type = 'synapse'`
//! - `style = {"width": 200, "height": 200}` (replaced wholesale)
//! - `data.label = "Synapse"`, all other `data` keys (notably `emoji`) kept
//!
//! **Before:**
//! ```json
//! { "type": "emoji", "style": {"width": 80}, "data": {"emoji": "🧠", "label": "brain"} }
//! ```
//!
//! **After:**
//! ```json
//! { "type": "synapse", "style": {"width": 200, "height": 200}, "data": {"emoji": "🧠", "label": "Synapse"} }
//! ```
//!
//! Rows are updated one at a time with no surrounding transaction; a failed
//! row is logged and recorded, the rest still migrate.

use serde_json::{json, Map, Value};
use tracing::{error, info};

use crate::db::{DatabaseError, NodeStore};
use crate::models::{CanvasNode, NodeType};
use crate::services::migrations::BatchReport;

pub const MIGRATION_NAME: &str = "emoji-to-synapse";
pub const SYNAPSE_WIDTH: u32 = 200;
pub const SYNAPSE_HEIGHT: u32 = 200;
pub const SYNAPSE_LABEL: &str = "Synapse";

/// Rewrite one emoji node as a synapse node
///
/// Non-object `data` is treated as empty.
pub fn to_synapse(node: &CanvasNode) -> CanvasNode {
    let mut data = match &node.data {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    data.insert("label".to_string(), json!(SYNAPSE_LABEL));

    CanvasNode {
        node_type: NodeType::Synapse,
        style: json!({ "width": SYNAPSE_WIDTH, "height": SYNAPSE_HEIGHT }),
        data: Value::Object(data),
        ..node.clone()
    }
}

/// Migrate every `emoji` node to `synapse`
///
/// # Errors
///
/// Only a failure to *select* the emoji rows is returned as an error. Rows
/// that cannot be decoded or updated are recorded in the returned
/// [`BatchReport`].
pub async fn migrate_emoji_to_synapse(store: &dyn NodeStore) -> Result<BatchReport, DatabaseError> {
    let rows = store.nodes_of_type(NodeType::Emoji).await?;
    info!(count = rows.len(), "found emoji nodes to migrate");

    let mut report = BatchReport::new(MIGRATION_NAME);

    for row in &rows {
        let node = match row {
            Ok(node) => node,
            Err(bad) => {
                error!(
                    node_id = %bad.id,
                    canvas_id = %bad.canvas_id,
                    reason = %bad.reason,
                    "skipping undecodable node"
                );
                report.record_failure(&bad.id, &bad.reason);
                continue;
            }
        };

        let migrated = to_synapse(node);
        match store.update_node(&migrated).await {
            Ok(()) => {
                info!(node_id = %node.id, "migrated node to synapse");
                report.record_success(&node.id);
            }
            Err(e) => {
                error!(node_id = %node.id, error = %e, "failed to migrate node");
                report.record_failure(&node.id, e.to_string());
            }
        }
    }

    info!(
        migrated = report.succeeded(),
        failed = report.total() - report.succeeded(),
        "emoji to synapse migration finished"
    );

    Ok(report)
}
