//! Database Error Types
//!
//! This module defines error types for database operations, providing
//! clear error handling for connection, initialization, and query failures.

use std::path::PathBuf;
use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to initialize database schema
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A table or column the query depends on does not exist
    #[error("Database schema is missing an object: {context}")]
    MissingSchema { context: String },

    /// A stored row could not be decoded into its model
    #[error("Invalid row in {table}: {reason}")]
    InvalidRow { table: String, reason: String },
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    pub fn invalid_row(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRow {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Classify a libsql failure raised while running `what`.
    ///
    /// SQLite reports absent tables/columns as `no such table` /
    /// `no such column`; those become [`DatabaseError::MissingSchema`] so
    /// callers can tell a misconfigured database from an ordinary failure.
    pub fn from_query(what: &str, err: libsql::Error) -> Self {
        let message = err.to_string();
        let lowered = message.to_lowercase();
        if lowered.contains("no such table") || lowered.contains("no such column") {
            Self::MissingSchema {
                context: format!("{}: {}", what, message),
            }
        } else {
            Self::sql_execution(format!("{}: {}", what, message))
        }
    }

    pub fn is_missing_schema(&self) -> bool {
        matches!(self, Self::MissingSchema { .. })
    }
}
