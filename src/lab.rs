//! Variant comparison lab
//!
//! Runs the latest user message through several independently configured
//! variants of the suggestion service and keeps the answers side by side,
//! together with reviewer judgments and reusable presets.

pub mod params;
pub mod presets;
pub mod registry;
pub mod scheduler;

#[allow(unused_imports)] // Public API re-exports
pub use params::{ParamError, ParamKey, VariantParams, JUDGMENT_CHECKS};
pub use presets::{DatabasePresetStore, Preset, PresetStore};
#[allow(unused_imports)] // Public API re-exports
pub use registry::{SlotStatus, Variant, VariantRegistry};
pub use scheduler::{LabContext, RunOutcome, RunSummary};

use crate::remote::SuggestionService;
use registry::VariantSlot;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabError {
    #[error("Unknown variant: {0}")]
    UnknownVariant(String),
    #[error(transparent)]
    InvalidParam(#[from] ParamError),
    #[error("Unknown judgment check: {0}")]
    UnknownCheck(String),
    #[error("Preset name must not be empty")]
    EmptyPresetName,
    #[error("Preset not found: {0}")]
    PresetNotFound(String),
    #[error("Comparison needs a remote session and a user message first")]
    SessionNotReady,
    #[error("No suggestion service is configured")]
    ServiceUnavailable,
    #[error("Preset store error: {0}")]
    Store(String),
}

/// Result of saving a preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedPreset {
    pub preset: Preset,
    /// An older preset with the same name exists and is now hidden by this one
    pub shadowed: bool,
}

/// Comparison panel state for one guide session
pub struct ComparisonLab {
    registry: VariantRegistry,
    service: Option<Arc<dyn SuggestionService>>,
    presets: Arc<dyn PresetStore>,
    open: AtomicBool,
    /// Session readiness as of the last sync
    was_ready: AtomicBool,
}

impl ComparisonLab {
    pub fn new(service: Option<Arc<dyn SuggestionService>>, presets: Arc<dyn PresetStore>) -> Self {
        Self {
            registry: VariantRegistry::new(),
            service,
            presets,
            open: AtomicBool::new(false),
            was_ready: AtomicBool::new(false),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn variants(&self) -> Vec<Variant> {
        self.registry.snapshot()
    }

    fn slot(&self, variant_id: &str) -> Result<Arc<VariantSlot>, LabError> {
        self.registry
            .get(variant_id)
            .ok_or_else(|| LabError::UnknownVariant(variant_id.to_string()))
    }

    fn ready(
        &self,
        context: Option<LabContext>,
    ) -> Result<(Arc<dyn SuggestionService>, LabContext), LabError> {
        let service = self.service.clone().ok_or(LabError::ServiceUnavailable)?;
        let context = context.ok_or(LabError::SessionNotReady)?;
        Ok((service, context))
    }

    // ==================== Panel ====================

    /// Open the panel. Runs every variant once if the panel was closed and
    /// the session is ready; a second open does nothing. A panel opened
    /// early runs on the `sync_readiness` that first sees the session ready.
    pub async fn open(&self, context: Option<LabContext>) -> Option<RunSummary> {
        if self.open.swap(true, Ordering::SeqCst) {
            return None;
        }
        let (service, context) = self.ready(context).ok()?;
        self.was_ready.store(true, Ordering::SeqCst);
        Some(scheduler::run_all(self.registry.slots(), service, context).await)
    }

    /// Follow the guide session after each change. Runs every variant when
    /// the session turns ready while the panel is open.
    pub async fn sync_readiness(&self, context: Option<LabContext>) -> Option<RunSummary> {
        let ready = self.ready(context);
        let was_ready = self.was_ready.swap(ready.is_ok(), Ordering::SeqCst);
        if was_ready || !self.is_open() {
            return None;
        }
        let (service, context) = ready.ok()?;
        tracing::debug!(session_id = %context.session_id, "Session became ready with the lab open");
        Some(scheduler::run_all(self.registry.slots(), service, context).await)
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub async fn run_all(&self, context: Option<LabContext>) -> Result<RunSummary, LabError> {
        let (service, context) = self.ready(context)?;
        Ok(scheduler::run_all(self.registry.slots(), service, context).await)
    }

    // ==================== Variants ====================

    /// Append a default variant. It only runs right away when the panel is
    /// open and the session is ready.
    pub async fn add_variant(&self, context: Option<LabContext>) -> Variant {
        let slot = self.registry.add();
        if self.is_open() {
            if let Ok((service, context)) = self.ready(context) {
                scheduler::evaluate_detached(Arc::clone(&slot), service, context).await;
            }
        }
        slot.snapshot()
    }

    /// Set one parameter, then re-run that variant alone.
    ///
    /// The edit is kept even when the session is not ready; only the
    /// evaluation is skipped, and the outcome is `None`.
    pub async fn update_param(
        &self,
        variant_id: &str,
        key: &str,
        value: &str,
        context: Option<LabContext>,
    ) -> Result<Option<RunOutcome>, LabError> {
        let slot = self.slot(variant_id)?;
        let key = ParamKey::parse(key)?;
        slot.update(|variant| variant.params.set(key, value))?;
        Ok(self.rerun(slot, context).await)
    }

    async fn rerun(&self, slot: Arc<VariantSlot>, context: Option<LabContext>) -> Option<RunOutcome> {
        match self.ready(context) {
            Ok((service, context)) => Some(scheduler::evaluate_detached(slot, service, context).await),
            Err(e) => {
                tracing::debug!(variant_id = %slot.id(), reason = %e, "Skipping variant evaluation");
                None
            }
        }
    }

    pub fn toggle_check(&self, variant_id: &str, label: &str) -> Result<Variant, LabError> {
        if !params::is_judgment_check(label) {
            return Err(LabError::UnknownCheck(label.to_string()));
        }
        let slot = self.slot(variant_id)?;
        slot.update(|variant| {
            let checked = variant.checks.entry(label.to_string()).or_insert(false);
            *checked = !*checked;
        });
        Ok(slot.snapshot())
    }

    pub fn set_notes(&self, variant_id: &str, notes: &str) -> Result<Variant, LabError> {
        let slot = self.slot(variant_id)?;
        slot.update(|variant| variant.notes = notes.to_string());
        Ok(slot.snapshot())
    }

    // ==================== Presets ====================

    pub async fn presets(&self) -> Result<Vec<Preset>, LabError> {
        self.presets.read_all().await.map_err(LabError::Store)
    }

    /// Save a copy of the variant's current params under `name`
    pub async fn save_preset(&self, variant_id: &str, name: &str) -> Result<SavedPreset, LabError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LabError::EmptyPresetName);
        }
        let slot = self.slot(variant_id)?;
        let shadowed = self
            .presets()
            .await?
            .iter()
            .any(|preset| preset.name == name);

        let preset = Preset::new(name, slot.snapshot().params);
        self.presets
            .append(preset.clone())
            .await
            .map_err(LabError::Store)?;

        if shadowed {
            tracing::warn!(name = %name, "Preset name reused; loads will use the newest");
        }
        Ok(SavedPreset { preset, shadowed })
    }

    /// Copy the newest preset named `name` into the variant and re-run it
    pub async fn apply_preset(
        &self,
        variant_id: &str,
        name: &str,
        context: Option<LabContext>,
    ) -> Result<Option<RunOutcome>, LabError> {
        let slot = self.slot(variant_id)?;
        let presets = self.presets().await?;
        let params = presets::resolve(&presets, name)
            .map(|preset| preset.params)
            .ok_or_else(|| LabError::PresetNotFound(name.to_string()))?;

        slot.update(|variant| variant.params = params);
        Ok(self.rerun(slot, context).await)
    }
}

/// Delete every preset named `name`; deleting nothing is an error
pub async fn delete_preset(store: &dyn PresetStore, name: &str) -> Result<usize, LabError> {
    let removed = store.delete(name).await.map_err(LabError::Store)?;
    if removed == 0 {
        return Err(LabError::PresetNotFound(name.to_string()));
    }
    tracing::info!(name = %name, removed, "Preset deleted");
    Ok(removed)
}
