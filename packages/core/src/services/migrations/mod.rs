//! One-off Data Migrations
//!
//! Each migration is an explicit, operator-run step (see the
//! `mindgrid-migrate` binary), not something applied on startup.
//!
//! ## Available Migrations
//!
//! - [`synapse`] - rewrite `emoji` nodes as `synapse` nodes
//! - [`node_type_constraint`] - (re)install the node type allow-list
//!
//! Row migrations report per-row outcomes through [`BatchReport`]; a failing
//! row is recorded and the batch moves on.

pub mod node_type_constraint;
pub mod synapse;

use serde::Serialize;

/// Outcome of migrating a single row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RowOutcome {
    Migrated { id: String },
    Failed { id: String, error: String },
}

impl RowOutcome {
    pub fn id(&self) -> &str {
        match self {
            RowOutcome::Migrated { id } | RowOutcome::Failed { id, .. } => id,
        }
    }
}

/// Per-row results of a batch migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub migration: String,
    pub outcomes: Vec<RowOutcome>,
}

impl BatchReport {
    pub fn new(migration: impl Into<String>) -> Self {
        Self {
            migration: migration.into(),
            outcomes: Vec::new(),
        }
    }

    pub fn record_success(&mut self, id: impl Into<String>) {
        self.outcomes.push(RowOutcome::Migrated { id: id.into() });
    }

    pub fn record_failure(&mut self, id: impl Into<String>, error: impl Into<String>) {
        self.outcomes.push(RowOutcome::Failed {
            id: id.into(),
            error: error.into(),
        });
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RowOutcome::Migrated { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            RowOutcome::Failed { id, error } => Some((id.as_str(), error.as_str())),
            RowOutcome::Migrated { .. } => None,
        })
    }

    /// True when every row migrated
    pub fn is_complete(&self) -> bool {
        self.succeeded() == self.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let mut report = BatchReport::new("test");
        report.record_success("a");
        report.record_failure("b", "boom");
        report.record_success("c");

        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded(), 2);
        assert!(!report.is_complete());
        assert_eq!(report.failures().collect::<Vec<_>>(), vec![("b", "boom")]);
        assert_eq!(report.outcomes[1].id(), "b");
    }

    #[test]
    fn test_empty_report_is_complete() {
        assert!(BatchReport::new("noop").is_complete());
    }
}
