//! MindGrid migration CLI
//!
//! Operator-run data and schema migrations against the MindGrid database.
//!
//! # Usage
//!
//! ```bash
//! # Rewrite emoji nodes as synapse nodes
//! mindgrid-migrate --database ./data/mindgrid.db emoji-to-synapse
//!
//! # (Re)install the node type allow-list
//! MINDGRID_DATABASE_PATH=./data/mindgrid.db mindgrid-migrate node-type-constraint
//!
//! # Issue a session token for local development
//! mindgrid-migrate --database ./data/mindgrid.db issue-session --user dev-user
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Duration;
use clap::{Parser, Subcommand};
use mindgrid_core::db::DatabaseService;
use mindgrid_core::services::migrations::node_type_constraint::{
    update_node_type_constraint, ConstraintOutcome,
};
use mindgrid_core::services::migrations::synapse::migrate_emoji_to_synapse;
use mindgrid_core::SessionService;
use std::sync::Arc;

/// MindGrid database migrations
#[derive(Parser)]
#[command(name = "mindgrid-migrate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run MindGrid data and schema migrations")]
struct Cli {
    /// Path to the MindGrid database file
    #[arg(long, env = "MINDGRID_DATABASE_PATH")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every emoji node into a synapse node
    EmojiToSynapse,

    /// Drop and recreate the node type check constraint
    NodeTypeConstraint,

    /// Create a session token for a user (local development)
    IssueSession {
        /// User id the session belongs to
        #[arg(long)]
        user: String,
        /// Session lifetime in hours
        #[arg(long, default_value = "168")]
        ttl_hours: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let db = DatabaseService::new(cli.database.clone()).await?;

    match cli.command {
        Commands::EmojiToSynapse => run_emoji_to_synapse(&db).await,
        Commands::NodeTypeConstraint => Ok(run_node_type_constraint(&db).await),
        Commands::IssueSession { user, ttl_hours } => {
            run_issue_session(db, &user, ttl_hours).await
        }
    }
}

async fn run_emoji_to_synapse(db: &DatabaseService) -> anyhow::Result<ExitCode> {
    let report = migrate_emoji_to_synapse(db).await?;

    println!(
        "{}: {} of {} nodes migrated",
        report.migration,
        report.succeeded(),
        report.total()
    );
    for (id, error) in report.failures() {
        println!("  failed {}: {}", id, error);
    }

    Ok(if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_node_type_constraint(db: &DatabaseService) -> ExitCode {
    match update_node_type_constraint(db).await {
        ConstraintOutcome::Applied { statements } => {
            println!("node type constraint applied ({} statements)", statements);
            ExitCode::SUCCESS
        }
        ConstraintOutcome::ManualApplicationRequired { reason, sql } => {
            println!("Could not apply the constraint automatically: {}", reason);
            println!("Run the following SQL manually:\n\n{}", sql);
            ExitCode::FAILURE
        }
    }
}

async fn run_issue_session(
    db: DatabaseService,
    user: &str,
    ttl_hours: i64,
) -> anyhow::Result<ExitCode> {
    let ttl = session_ttl(ttl_hours)?;
    let sessions = SessionService::with_ttl(Arc::new(db), ttl);
    let session = sessions.create_session(user).await?;

    println!("{}", session.token);
    eprintln!(
        "session for {} expires at {}",
        session.user_id,
        session.expires_at.to_rfc3339()
    );
    Ok(ExitCode::SUCCESS)
}

fn session_ttl(hours: i64) -> anyhow::Result<Duration> {
    if hours <= 0 {
        anyhow::bail!("--ttl-hours must be positive");
    }
    Duration::try_hours(hours)
        .ok_or_else(|| anyhow::anyhow!("--ttl-hours {} is out of range", hours))
}
