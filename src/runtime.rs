//! Runtime for guide sessions
//!
//! Each session pairs a guide runtime with its comparison lab. Sessions live
//! in memory for the life of the process; presets are the only shared state.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::{GuideRuntime, GuideSnapshot};

use crate::guide::{GuideContext, StepSequencer};
use crate::lab::{ComparisonLab, PresetStore, RunSummary};
use crate::remote::SuggestionService;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Everything that belongs to one guide session
pub struct SessionEntry {
    pub guide: GuideRuntime,
    pub lab: ComparisonLab,
}

impl SessionEntry {
    /// Let the lab follow the guide after a guide command. Returns the run
    /// that started because the session just became ready.
    pub async fn sync_lab(&self) -> Option<RunSummary> {
        self.lab.sync_readiness(self.guide.lab_context()).await
    }
}

/// Manager for all guide sessions
pub struct SessionManager {
    sequencer: Arc<StepSequencer>,
    service: Option<Arc<dyn SuggestionService>>,
    presets: Arc<dyn PresetStore>,
    max_input_chars: Option<usize>,
    sessions: RwLock<HashMap<String, Arc<SessionEntry>>>,
}

impl SessionManager {
    pub fn new(
        sequencer: Arc<StepSequencer>,
        service: Option<Arc<dyn SuggestionService>>,
        presets: Arc<dyn PresetStore>,
    ) -> Self {
        Self {
            sequencer,
            service,
            presets,
            max_input_chars: None,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_max_input(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = Some(max_input_chars);
        self
    }

    pub fn presets(&self) -> &Arc<dyn PresetStore> {
        &self.presets
    }

    /// Start a new session and register it
    pub async fn create(&self) -> Arc<SessionEntry> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let mut context = GuideContext::new(session_id.clone(), Arc::clone(&self.sequencer));
        if self.service.is_some() {
            context = context.with_remote();
        }
        if let Some(max) = self.max_input_chars {
            context = context.with_max_input(max);
        }

        let guide = GuideRuntime::start(context, self.service.clone()).await;
        let lab = ComparisonLab::new(self.service.clone(), Arc::clone(&self.presets));
        let entry = Arc::new(SessionEntry { guide, lab });

        self.sessions
            .write()
            .await
            .insert(session_id.clone(), Arc::clone(&entry));
        tracing::info!(session_id = %session_id, "Session created");
        entry
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<SessionEntry>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Drop a session. Returns false if it was unknown.
    pub async fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            tracing::info!(session_id = %session_id, "Session removed");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{InMemoryPresetStore, MockSuggestionService};

    fn manager(service: Option<Arc<dyn SuggestionService>>) -> SessionManager {
        SessionManager::new(
            Arc::new(StepSequencer::blueprint()),
            service,
            Arc::new(InMemoryPresetStore::new()),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let manager = manager(None);
        let entry = manager.create().await;
        let id = entry.guide.session_id().to_string();

        let found = manager.get(&id).await.unwrap();
        assert!(Arc::ptr_eq(&entry, &found));
        assert!(manager.get("missing").await.is_none());
        assert!(manager.remove(&id).await);
        assert!(manager.get(&id).await.is_none());
        assert!(!manager.remove(&id).await);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let service = Arc::new(MockSuggestionService::new());
        let manager = manager(Some(service as Arc<dyn SuggestionService>));
        let first = manager.create().await;
        let second = manager.create().await;

        first.guide.submit_text("a shop").await.unwrap();

        assert_eq!(first.guide.snapshot().step_index, 1);
        assert_eq!(second.guide.snapshot().step_index, 0);
        assert_ne!(
            first.guide.snapshot().remote_session_id,
            second.guide.snapshot().remote_session_id
        );
    }

    #[tokio::test]
    async fn test_open_lab_follows_guide() {
        let service = Arc::new(MockSuggestionService::new());
        let manager = manager(Some(Arc::clone(&service) as Arc<dyn SuggestionService>));
        let entry = manager.create().await;

        assert!(entry.lab.open(entry.guide.lab_context()).await.is_none());
        assert!(entry.sync_lab().await.is_none());

        entry.guide.submit_text("a shop").await.unwrap();
        let run = entry.sync_lab().await.unwrap();
        assert_eq!(run.updated.len(), 2);
        assert_eq!(service.evaluation_count(), 2);

        entry.guide.go_back().await.unwrap();
        assert!(entry.sync_lab().await.is_none());
        assert_eq!(service.evaluation_count(), 2);
    }

    #[tokio::test]
    async fn test_max_input_is_applied() {
        let manager = manager(None).with_max_input(5);
        let entry = manager.create().await;
        assert!(entry.guide.submit_text("too long").await.is_err());
        assert!(entry.guide.submit_text("short").await.is_ok());
    }
}
