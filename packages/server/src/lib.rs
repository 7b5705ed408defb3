//! MindGrid HTTP server
//!
//! # Architecture
//!
//! The server is organized into modular endpoint modules, each contributing
//! a `routes(state)` router merged by [`create_router`]:
//!
//! - `canvas_endpoints`: canvases, folders, graph persistence, settings, health
//! - `ai_endpoints`: image, suggestions, text analysis and text actions
//! - `page_endpoints`: landing and auth boundary pages
//! - `debug_endpoints`: raw settings diagnostics (`debug-endpoints` feature only)
//!
//! Stored files are served from `/storage`.
//!
//! # Usage
//!
//! ```bash
//! MINDGRID_DATABASE_PATH=./data/mindgrid.db \
//! MINDGRID_PUBLIC_URL=http://localhost:3000 \
//! cargo run --bin mindgrid-server
//! ```

use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use mindgrid_core::ai::{AiService, ChatOptions, GenerationProvider, OpenAiProvider};
use mindgrid_core::db::DatabaseService;
use mindgrid_core::storage::{LocalObjectStore, ObjectStore, STORAGE_ROUTE_PREFIX};
use mindgrid_core::{CanvasService, GraphService, SessionService, SettingsService};

mod ai_endpoints;
pub mod auth;
mod canvas_endpoints;
pub mod config;
#[cfg(feature = "debug-endpoints")]
mod debug_endpoints;
mod http_error;
mod page_endpoints;

pub use config::{AppConfig, ConfigError};
pub use http_error::{ErrorBody, HttpError};

/// Application state shared across all endpoints
///
/// Every service is immutable after startup and shared through `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseService>,
    pub canvases: Arc<CanvasService>,
    pub graphs: Arc<GraphService>,
    pub settings: Arc<SettingsService>,
    pub sessions: Arc<SessionService>,
    pub ai: Arc<AiService>,
}

impl AppState {
    /// Open the database and wire the production provider and object store
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let db = DatabaseService::new(config.database_path.clone())
            .await
            .with_context(|| format!("opening database {}", config.database_path.display()))?;

        let provider = OpenAiProvider::new(config.ai_base_url.clone(), config.ai_timeout)
            .context("building generation API client")?;
        let store = LocalObjectStore::new(config.storage_dir.clone(), config.public_url.clone());

        Ok(Self::with_components(
            config,
            Arc::new(db),
            Arc::new(provider),
            Arc::new(store),
        ))
    }

    /// Assemble state from already-built parts
    pub fn with_components(
        config: AppConfig,
        db: Arc<DatabaseService>,
        provider: Arc<dyn GenerationProvider>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let canvases = Arc::new(CanvasService::new(db.clone()));
        let graphs = Arc::new(GraphService::new(db.clone(), canvases.clone()));
        let settings = Arc::new(SettingsService::new(db.clone()));
        let sessions = Arc::new(SessionService::new(db.clone()));
        let ai = Arc::new(
            AiService::new(settings.clone(), provider, store)
                .with_chat_options(ChatOptions::default().with_model(config.ai_chat_model.clone())),
        );

        Self {
            config: Arc::new(config),
            db,
            canvases,
            graphs,
            settings,
            sessions,
            ai,
        }
    }
}

/// Create the main application router with all endpoint modules
pub fn create_router(state: AppState) -> Router {
    let storage = ServeDir::new(state.config.storage_dir.clone());
    let cors = cors_layer(state.config.cors_allow_origin.as_deref());

    let router = Router::new()
        .merge(canvas_endpoints::routes(state.clone()))
        .merge(ai_endpoints::routes(state.clone()))
        .merge(page_endpoints::routes(state.clone()));

    #[cfg(feature = "debug-endpoints")]
    let router = router.merge(debug_endpoints::routes(state.clone()));

    router
        .nest_service(STORAGE_ROUTE_PREFIX, storage)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// CORS layer
///
/// Allows the common local front-end ports unless `CORS_ALLOW_ORIGIN` names
/// a single origin. An unparseable origin falls back to the defaults.
fn cors_layer(custom_origin: Option<&str>) -> CorsLayer {
    let default_origins = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://127.0.0.1:3000",
    ];

    let custom = custom_origin.and_then(|origin| match origin.parse::<HeaderValue>() {
        Ok(value) => Some(vec![value]),
        Err(e) => {
            tracing::warn!(origin, error = %e, "ignoring invalid CORS_ALLOW_ORIGIN");
            None
        }
    });

    let origins = custom.unwrap_or_else(|| {
        default_origins
            .into_iter()
            .map(HeaderValue::from_static)
            .collect()
    });

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns error if the server fails to bind or start.
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let port = state.config.port;
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("MindGrid server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
