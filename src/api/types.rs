//! API request and response types

use crate::guide::{BlueprintDraft, TurnId};
use crate::lab::{Preset, RunOutcome, RunSummary, Variant};
use serde::{Deserialize, Serialize};

/// Free-text answer to the active prompt
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Pick or toggle one option on a prompt turn
#[derive(Debug, Deserialize)]
pub struct OptionRequest {
    pub turn_id: TurnId,
    pub option_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub turn_id: TurnId,
}

#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub draft: BlueprintDraft,
    pub markdown: String,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub json_path: String,
    pub markdown_path: String,
}

/// Comparison panel state
#[derive(Debug, Serialize)]
pub struct LabResponse {
    pub open: bool,
    /// A remote session and a user message exist
    pub ready: bool,
    pub variants: Vec<Variant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunSummary>,
}

/// One tunable variant parameter as the lab panel shows it
#[derive(Debug, Serialize)]
pub struct ParamSchema {
    pub key: &'static str,
    pub label: &'static str,
    pub info: &'static str,
    pub options: Vec<&'static str>,
    pub default: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ParamSchemaResponse {
    pub params: Vec<ParamSchema>,
    pub checks: &'static [&'static str],
}

#[derive(Debug, Deserialize)]
pub struct ParamRequest {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct NotesRequest {
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct PresetRequest {
    pub name: String,
}

/// A variant after an edit, with the outcome of its re-run if one happened
#[derive(Debug, Serialize)]
pub struct VariantResponse {
    pub variant: Variant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RunOutcome>,
}

#[derive(Debug, Serialize)]
pub struct PresetListResponse {
    pub presets: Vec<Preset>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub removed: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
