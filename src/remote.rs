//! Suggestion service boundary
//!
//! The answer-generation engine is an opaque remote collaborator. This module
//! owns its contract, the typed shapes it exchanges, and the HTTP client.

mod error;
mod http;
mod types;

#[allow(unused_imports)] // Public API re-exports
pub use error::{RemoteError, RemoteErrorKind};
pub use http::HttpSuggestionService;
#[allow(unused_imports)] // Public API re-exports
pub use types::{SessionOpening, StepLabel, TurnReply, VariantReply, COMPLETE_STEP};

use crate::lab::VariantParams;
use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for suggestion services
#[async_trait]
pub trait SuggestionService: Send + Sync {
    /// Open a remote session and fetch its greeting
    async fn create_session(&self) -> Result<SessionOpening, RemoteError>;

    /// Send one committed user message
    async fn send_turn(&self, session_id: &str, message: &str) -> Result<TurnReply, RemoteError>;

    /// Restart an existing remote session from its first step
    async fn reset_session(&self, session_id: &str) -> Result<TurnReply, RemoteError>;

    /// Answer `message` under one variant's parameters, without advancing the session
    async fn evaluate_variant(
        &self,
        session_id: &str,
        message: &str,
        params: &VariantParams,
    ) -> Result<VariantReply, RemoteError>;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// Logging wrapper for suggestion services
pub struct LoggingService {
    inner: Arc<dyn SuggestionService>,
    name: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn SuggestionService>) -> Self {
        let name = inner.name().to_string();
        Self { inner, name }
    }

    fn log<T>(&self, call: &'static str, started: std::time::Instant, result: &Result<T, RemoteError>) {
        let duration = started.elapsed();
        match result {
            Ok(_) => {
                tracing::info!(
                    service = %self.name,
                    call,
                    duration_ms = %duration.as_millis(),
                    "Remote call completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    service = %self.name,
                    call,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Remote call failed"
                );
            }
        }
    }
}

#[async_trait]
impl SuggestionService for LoggingService {
    async fn create_session(&self) -> Result<SessionOpening, RemoteError> {
        let start = std::time::Instant::now();
        let result = self.inner.create_session().await;
        self.log("create_session", start, &result);
        result
    }

    async fn send_turn(&self, session_id: &str, message: &str) -> Result<TurnReply, RemoteError> {
        let start = std::time::Instant::now();
        let result = self.inner.send_turn(session_id, message).await;
        self.log("send_turn", start, &result);
        result
    }

    async fn reset_session(&self, session_id: &str) -> Result<TurnReply, RemoteError> {
        let start = std::time::Instant::now();
        let result = self.inner.reset_session(session_id).await;
        self.log("reset_session", start, &result);
        result
    }

    async fn evaluate_variant(
        &self,
        session_id: &str,
        message: &str,
        params: &VariantParams,
    ) -> Result<VariantReply, RemoteError> {
        let start = std::time::Instant::now();
        let result = self.inner.evaluate_variant(session_id, message, params).await;
        self.log("evaluate_variant", start, &result);
        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}
