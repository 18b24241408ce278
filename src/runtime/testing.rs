//! Mock implementations for testing
//!
//! These mocks enable runtime, lab and API tests without real I/O.

use crate::lab::{Preset, PresetStore, VariantParams};
use crate::remote::{
    RemoteError, SessionOpening, StepLabel, SuggestionService, TurnReply, VariantReply,
};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// One recorded call against a mock service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    CreateSession,
    SendTurn { session_id: String, message: String },
    ResetSession { session_id: String },
    EvaluateVariant {
        session_id: String,
        message: String,
        params: VariantParams,
    },
}

// ============================================================================
// Mock Suggestion Service
// ============================================================================

/// Mock service with queued answers and deterministic defaults
#[allow(dead_code)]
pub struct MockSuggestionService {
    openings: Mutex<VecDeque<Result<SessionOpening, RemoteError>>>,
    turns: Mutex<VecDeque<Result<TurnReply, RemoteError>>>,
    failing_params: Mutex<HashSet<VariantParams>>,
    /// Delays applied to successive `evaluate_variant` calls
    variant_delays: Mutex<VecDeque<Duration>>,
    sessions_created: Mutex<u32>,
    /// Record of all calls made
    pub calls: Mutex<Vec<RemoteCall>>,
}

#[allow(dead_code)]
impl MockSuggestionService {
    pub fn new() -> Self {
        Self {
            openings: Mutex::new(VecDeque::new()),
            turns: Mutex::new(VecDeque::new()),
            failing_params: Mutex::new(HashSet::new()),
            variant_delays: Mutex::new(VecDeque::new()),
            sessions_created: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue the answer to the next `create_session`
    pub fn queue_opening(&self, opening: Result<SessionOpening, RemoteError>) {
        self.openings.lock().unwrap().push_back(opening);
    }

    /// Queue the answer to the next `send_turn`
    pub fn queue_turn(&self, reply: Result<TurnReply, RemoteError>) {
        self.turns.lock().unwrap().push_back(reply);
    }

    /// Make every evaluation with these params fail
    pub fn fail_params(&self, params: VariantParams) {
        self.failing_params.lock().unwrap().insert(params);
    }

    pub fn queue_variant_delay(&self, delay: Duration) {
        self.variant_delays.lock().unwrap().push_back(delay);
    }

    pub fn recorded_calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn evaluation_count(&self) -> usize {
        self.recorded_calls()
            .iter()
            .filter(|call| matches!(call, RemoteCall::EvaluateVariant { .. }))
            .count()
    }

    fn record(&self, call: RemoteCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Reply text the mock produces for a variant
    pub fn variant_text(message: &str, params: &VariantParams) -> String {
        format!(
            "[{} / {}] {}",
            params.confidence_range.as_str(),
            params.risk_tolerance.as_str(),
            message
        )
    }

    fn default_opening(&self) -> SessionOpening {
        let mut created = self.sessions_created.lock().unwrap();
        *created += 1;
        SessionOpening {
            session_id: format!("remote-{created}"),
            reply: Some("Welcome to the blueprint guide.".to_string()),
            evidence: vec![],
            draft_snapshot: Some(serde_json::json!({})),
            step: StepLabel::new("app_type"),
        }
    }
}

impl Default for MockSuggestionService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SuggestionService for MockSuggestionService {
    async fn create_session(&self) -> Result<SessionOpening, RemoteError> {
        self.record(RemoteCall::CreateSession);
        let queued = self.openings.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(self.default_opening()))
    }

    async fn send_turn(&self, session_id: &str, message: &str) -> Result<TurnReply, RemoteError> {
        self.record(RemoteCall::SendTurn {
            session_id: session_id.to_string(),
            message: message.to_string(),
        });
        self.turns.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(TurnReply {
                reply: Some(format!("Noted: {message}")),
                evidence: vec![],
                draft_snapshot: None,
                step: StepLabel::new("next"),
            })
        })
    }

    async fn reset_session(&self, session_id: &str) -> Result<TurnReply, RemoteError> {
        self.record(RemoteCall::ResetSession {
            session_id: session_id.to_string(),
        });
        Ok(TurnReply {
            reply: Some("Starting over.".to_string()),
            evidence: vec![],
            draft_snapshot: Some(serde_json::json!({})),
            step: StepLabel::new("app_type"),
        })
    }

    async fn evaluate_variant(
        &self,
        session_id: &str,
        message: &str,
        params: &VariantParams,
    ) -> Result<VariantReply, RemoteError> {
        self.record(RemoteCall::EvaluateVariant {
            session_id: session_id.to_string(),
            message: message.to_string(),
            params: *params,
        });
        let delay = self.variant_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_params.lock().unwrap().contains(params) {
            return Err(RemoteError::server_error("Server error: variant failed"));
        }
        Ok(VariantReply {
            reply: Self::variant_text(message, params),
            evidence: vec![],
            draft_snapshot: None,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Gated Mock Service (for in-flight testing)
// ============================================================================

/// Mock whose `send_turn` and `reset_session` block until released
pub struct GatedSuggestionService {
    inner: MockSuggestionService,
    /// Notified when a turn request starts
    pub turn_started: Arc<Notify>,
    /// Notified when a reset request starts
    pub reset_started: Arc<Notify>,
    /// Notify once to let one pending call finish
    pub release: Arc<Notify>,
}

impl GatedSuggestionService {
    pub fn new() -> Self {
        Self {
            inner: MockSuggestionService::new(),
            turn_started: Arc::new(Notify::new()),
            reset_started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }

    pub fn inner(&self) -> &MockSuggestionService {
        &self.inner
    }
}

#[async_trait]
impl SuggestionService for GatedSuggestionService {
    async fn create_session(&self) -> Result<SessionOpening, RemoteError> {
        self.inner.create_session().await
    }

    async fn send_turn(&self, session_id: &str, message: &str) -> Result<TurnReply, RemoteError> {
        self.turn_started.notify_one();
        self.release.notified().await;
        self.inner.send_turn(session_id, message).await
    }

    async fn reset_session(&self, session_id: &str) -> Result<TurnReply, RemoteError> {
        self.reset_started.notify_one();
        self.release.notified().await;
        self.inner.reset_session(session_id).await
    }

    async fn evaluate_variant(
        &self,
        session_id: &str,
        message: &str,
        params: &VariantParams,
    ) -> Result<VariantReply, RemoteError> {
        self.inner.evaluate_variant(session_id, message, params).await
    }

    fn name(&self) -> &str {
        "gated-mock"
    }
}

// ============================================================================
// In-Memory Preset Store
// ============================================================================

/// In-memory preset store for testing
#[derive(Default)]
pub struct InMemoryPresetStore {
    presets: Mutex<Vec<Preset>>,
}

impl InMemoryPresetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresetStore for InMemoryPresetStore {
    async fn read_all(&self) -> Result<Vec<Preset>, String> {
        Ok(self.presets.lock().unwrap().clone())
    }

    async fn append(&self, preset: Preset) -> Result<(), String> {
        self.presets.lock().unwrap().push(preset);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<usize, String> {
        let mut presets = self.presets.lock().unwrap();
        let before = presets.len();
        presets.retain(|preset| preset.name != name);
        Ok(before - presets.len())
    }
}
