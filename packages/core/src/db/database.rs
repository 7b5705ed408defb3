//! Database Connection Management
//!
//! This module provides the core database connection and initialization
//! functionality using libsql for MindGrid's canvas store.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf
//! - **Idempotent schema**: `CREATE ... IF NOT EXISTS` on every start
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **Foreign keys**: Enabled so canvas deletion cascades to nodes and edges
//! - **JSON payloads**: Node `style`/`data` and edge `data` stored as JSON text
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions.** The 5-second
//! busy timeout lets concurrent requests wait for the write lock instead of
//! failing immediately with `SQLITE_BUSY`.
//!
//! ```no_run
//! # use mindgrid_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(PathBuf::from("./data/mindgrid.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::db::error::DatabaseError;
use crate::models::NodeType;
use crate::services::migrations::node_type_constraint;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Database service for managing the libsql connection and schema
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    /// 4. Install the node type check triggers
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        let is_new_database = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema(is_new_database).await?;

        tracing::debug!(path = %service.db_path.display(), is_new_database, "database ready");

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// # Schema
    ///
    /// - `folders`, `canvases`, `profiles`, `user_settings`, `sessions`
    /// - `nodes` / `edges`: canvas graph, cascading on canvas deletion
    /// - `edge_tombstones`: ids of permanently deleted edges
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        let tables: [(&str, &str); 8] = [
            (
                "folders",
                "CREATE TABLE IF NOT EXISTS folders (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL
                )",
            ),
            (
                "canvases",
                "CREATE TABLE IF NOT EXISTS canvases (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    description TEXT,
                    user_id TEXT NOT NULL,
                    organization_id TEXT,
                    folder_id TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    FOREIGN KEY (folder_id) REFERENCES folders(id) ON DELETE SET NULL
                )",
            ),
            (
                "profiles",
                "CREATE TABLE IF NOT EXISTS profiles (
                    user_id TEXT PRIMARY KEY,
                    organization_id TEXT
                )",
            ),
            (
                "user_settings",
                "CREATE TABLE IF NOT EXISTS user_settings (
                    user_id TEXT PRIMARY KEY,
                    openai_api_key TEXT,
                    updated_at TEXT NOT NULL
                )",
            ),
            (
                "sessions",
                "CREATE TABLE IF NOT EXISTS sessions (
                    token TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    expires_at INTEGER NOT NULL
                )",
            ),
            (
                "nodes",
                "CREATE TABLE IF NOT EXISTS nodes (
                    id TEXT NOT NULL,
                    canvas_id TEXT NOT NULL,
                    type TEXT NOT NULL,
                    position_x REAL NOT NULL DEFAULT 0,
                    position_y REAL NOT NULL DEFAULT 0,
                    style TEXT NOT NULL DEFAULT '{}',
                    data TEXT NOT NULL DEFAULT '{}',
                    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    -- Editor ids are only unique within one canvas
                    PRIMARY KEY (canvas_id, id),
                    FOREIGN KEY (canvas_id) REFERENCES canvases(id) ON DELETE CASCADE
                )",
            ),
            (
                "edges",
                "CREATE TABLE IF NOT EXISTS edges (
                    id TEXT NOT NULL,
                    canvas_id TEXT NOT NULL,
                    source TEXT NOT NULL,
                    target TEXT NOT NULL,
                    source_handle TEXT,
                    target_handle TEXT,
                    type TEXT NOT NULL DEFAULT 'default',
                    data TEXT NOT NULL DEFAULT '{}',
                    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    PRIMARY KEY (canvas_id, id),
                    FOREIGN KEY (canvas_id) REFERENCES canvases(id) ON DELETE CASCADE,
                    -- Removing an endpoint node removes the edge with it
                    FOREIGN KEY (canvas_id, source) REFERENCES nodes(canvas_id, id) ON DELETE CASCADE,
                    FOREIGN KEY (canvas_id, target) REFERENCES nodes(canvas_id, id) ON DELETE CASCADE
                )",
            ),
            (
                "edge_tombstones",
                "CREATE TABLE IF NOT EXISTS edge_tombstones (
                    canvas_id TEXT NOT NULL,
                    edge_id TEXT NOT NULL,
                    deleted_at TEXT NOT NULL,
                    PRIMARY KEY (canvas_id, edge_id)
                )",
            ),
        ];

        for (name, ddl) in tables {
            conn.execute(ddl, ()).await.map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create {} table: {}",
                    name, e
                ))
            })?;
        }

        self.create_core_indexes(&conn).await?;

        for statement in node_type_constraint::constraint_statements(&NodeType::ALL) {
            conn.execute(&statement, ()).await.map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to install node type constraint: {}",
                    e
                ))
            })?;
        }

        // Flush the fresh schema so a second handle opened right away sees it
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Create core indexes
    async fn create_core_indexes(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        let indexes = [
            ("idx_nodes_type", "CREATE INDEX IF NOT EXISTS idx_nodes_type ON nodes(type)"),
            (
                "idx_canvases_user",
                "CREATE INDEX IF NOT EXISTS idx_canvases_user ON canvases(user_id)",
            ),
            (
                "idx_folders_user_name",
                "CREATE INDEX IF NOT EXISTS idx_folders_user_name ON folders(user_id, name)",
            ),
            (
                "idx_sessions_user",
                "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)",
            ),
        ];

        for (name, ddl) in indexes {
            conn.execute(ddl, ()).await.map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to create index '{}': {}", name, e))
            })?;
        }

        Ok(())
    }

    /// Get a raw connection handle
    ///
    /// In async functions use `connect_with_timeout()` instead.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get a connection with busy timeout and foreign keys configured
    ///
    /// `foreign_keys` is a per-connection setting in SQLite, so it is
    /// re-enabled on every handle.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }

    /// Run a single SQL statement that returns no rows
    pub async fn execute_sql(&self, sql: &str) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute(sql, ())
            .await
            .map_err(|e| DatabaseError::from_query("execute statement", e))
    }
}

/// Parse a stored timestamp
///
/// SQLite CURRENT_TIMESTAMP returns "YYYY-MM-DD HH:MM:SS"; rows written by
/// this crate use RFC3339.
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    Err(DatabaseError::sql_execution(format!(
        "Unable to parse timestamp '{}' as RFC3339 or SQLite format",
        s
    )))
}
