//! Blueprint Guide - guided spec drafting with a variant comparison lab
//!
//! Walks a user through a scripted conversation that fills a blueprint
//! draft, optionally backed by a remote suggestion service.

mod api;
mod config;
mod db;
mod guide;
mod lab;
mod remote;
mod runtime;

use api::{create_router, AppState};
use config::AppConfig;
use db::Database;
use guide::StepSequencer;
use lab::DatabasePresetStore;
use remote::{HttpSuggestionService, LoggingService, SuggestionService};
use runtime::SessionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blueprint_guide=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();

    tracing::info!(path = %config.db_path.display(), "Opening preset database");
    let db = Database::open(&config.db_path)?;
    let presets = Arc::new(DatabasePresetStore::new(db));

    let service: Option<Arc<dyn SuggestionService>> = match &config.api_base {
        Some(base) => {
            tracing::info!(base_url = %base, "Using remote suggestion service");
            let http = Arc::new(HttpSuggestionService::new(base, config.remote_timeout));
            Some(Arc::new(LoggingService::new(http)))
        }
        None => {
            tracing::warn!("BLUEPRINT_API_BASE not set; guide runs scripted and the lab is unavailable");
            None
        }
    };

    let sessions = SessionManager::new(Arc::new(StepSequencer::blueprint()), service, presets)
        .with_max_input(config.max_input_chars);

    let port = config.port;
    let state = AppState::new(sessions, config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Blueprint guide listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
