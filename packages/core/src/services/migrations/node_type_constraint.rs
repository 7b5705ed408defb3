//! Node Type Check Constraint
//!
//! SQLite cannot alter a table's CHECK constraint in place, so the allow-list
//! on `nodes.type` is enforced by two triggers sharing the constraint name:
//! `nodes_type_check_insert` and `nodes_type_check_update`. Installing means
//! `DROP TRIGGER IF EXISTS` followed by `CREATE TRIGGER`, which makes the
//! update re-runnable.
//!
//! When the statements cannot be executed, [`update_node_type_constraint`]
//! returns the literal SQL so an operator can apply it by hand.

use serde::Serialize;
use tracing::{info, warn};

use crate::db::SqlExecutor;
use crate::models::NodeType;

pub const CONSTRAINT_NAME: &str = "nodes_type_check";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ConstraintOutcome {
    Applied { statements: usize },
    /// Execution failed; `sql` must be applied manually
    ManualApplicationRequired { reason: String, sql: String },
}

fn allow_list(types: &[NodeType]) -> String {
    types
        .iter()
        .map(|t| format!("'{}'", t.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Statements that (re)install the constraint for `types`, in execution order
pub fn constraint_statements(types: &[NodeType]) -> Vec<String> {
    let allowed = allow_list(types);
    let mut statements = Vec::with_capacity(4);

    for (suffix, event) in [("insert", "INSERT"), ("update", "UPDATE OF type")] {
        let trigger = format!("{}_{}", CONSTRAINT_NAME, suffix);
        statements.push(format!("DROP TRIGGER IF EXISTS {}", trigger));
        statements.push(format!(
            "CREATE TRIGGER {trigger} BEFORE {event} ON nodes \
             WHEN NEW.type NOT IN ({allowed}) \
             BEGIN SELECT RAISE(ABORT, '{name}: invalid node type'); END",
            trigger = trigger,
            event = event,
            allowed = allowed,
            name = CONSTRAINT_NAME,
        ));
    }

    statements
}

/// The statements as one script, for manual application
pub fn constraint_sql(types: &[NodeType]) -> String {
    constraint_statements(types)
        .into_iter()
        .map(|s| format!("{};", s))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Install the allow-list containing every known node type
///
/// Never fails: an execution error degrades to
/// [`ConstraintOutcome::ManualApplicationRequired`].
pub async fn update_node_type_constraint(executor: &dyn SqlExecutor) -> ConstraintOutcome {
    let statements = constraint_statements(&NodeType::ALL);

    for statement in &statements {
        if let Err(e) = executor.execute(statement).await {
            warn!(error = %e, "could not apply node type constraint, manual application required");
            return ConstraintOutcome::ManualApplicationRequired {
                reason: e.to_string(),
                sql: constraint_sql(&NodeType::ALL),
            };
        }
    }

    info!(
        statements = statements.len(),
        constraint = CONSTRAINT_NAME,
        "node type constraint applied"
    );
    ConstraintOutcome::Applied {
        statements: statements.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseError, DatabaseService};
    use crate::models::CanvasNode;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct UnavailableExecutor {
        attempts: Mutex<usize>,
    }

    #[async_trait]
    impl SqlExecutor for UnavailableExecutor {
        async fn execute(&self, _sql: &str) -> Result<(), DatabaseError> {
            *self.attempts.lock().unwrap() += 1;
            Err(DatabaseError::sql_execution("exec_sql is not available"))
        }
    }

    #[test]
    fn test_statements_drop_before_create() {
        let statements = constraint_statements(&NodeType::ALL);
        assert_eq!(statements.len(), 4);
        assert!(statements[0].starts_with("DROP TRIGGER IF EXISTS nodes_type_check_insert"));
        assert!(statements[1].starts_with("CREATE TRIGGER nodes_type_check_insert"));
        assert!(statements[1].contains("'synapse'"));
        assert!(statements[1].contains("'ai-response'"));
    }

    #[tokio::test]
    async fn test_failure_degrades_to_manual_sql() {
        let executor = UnavailableExecutor {
            attempts: Mutex::new(0),
        };

        let outcome = update_node_type_constraint(&executor).await;

        match outcome {
            ConstraintOutcome::ManualApplicationRequired { reason, sql } => {
                assert!(reason.contains("exec_sql is not available"));
                assert_eq!(sql, constraint_sql(&NodeType::ALL));
            }
            other => panic!("expected manual application, got {:?}", other),
        }
        assert_eq!(*executor.attempts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_applies_and_is_rerunnable_on_libsql() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let db = DatabaseService::new(temp_dir.path().join("constraint.db")).await?;

        for _ in 0..2 {
            let outcome = update_node_type_constraint(&db).await;
            assert_eq!(outcome, ConstraintOutcome::Applied { statements: 4 });
        }

        db.execute_sql(
            "INSERT INTO canvases (id, name, user_id, created_at, updated_at)
             VALUES ('c1', 'Board', 'u1', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
        )
        .await?;

        let ok = CanvasNode::new("c1", NodeType::Synapse, json!({})).with_id("n1");
        db.db_insert_node(&ok).await?;

        let rejected = db
            .execute_sql("INSERT INTO nodes (id, canvas_id, type) VALUES ('n2', 'c1', 'widget')")
            .await;
        assert!(rejected.is_err());

        let rejected = db
            .execute_sql("UPDATE nodes SET type = 'widget' WHERE id = 'n1'")
            .await;
        assert!(rejected.is_err());

        Ok(())
    }
}
