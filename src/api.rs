//! HTTP API for the blueprint guide and comparison lab

mod handlers;
mod types;

pub use handlers::create_router;

use crate::config::AppConfig;
use crate::runtime::SessionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(sessions: SessionManager, config: AppConfig) -> Self {
        Self {
            sessions: Arc::new(sessions),
            config: Arc::new(config),
        }
    }
}
