//! MindGrid HTTP Server Binary
//!
//! # Usage
//!
//! ```bash
//! MINDGRID_DATABASE_PATH=./data/mindgrid.db \
//! MINDGRID_PUBLIC_URL=http://localhost:3000 \
//! cargo run --bin mindgrid-server
//! ```
//!
//! See [`mindgrid_server::config`] for every environment variable.
//! `RUST_LOG` sets the log level (default `info`).

use mindgrid_server::{start_server, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!(
        database = %config.database_path.display(),
        storage = %config.storage_dir.display(),
        ai_base_url = %config.ai_base_url,
        "starting MindGrid server"
    );
    if cfg!(feature = "debug-endpoints") {
        tracing::warn!("debug endpoints enabled - not for production use");
    }

    let state = AppState::from_config(config).await?;
    start_server(state).await
}
