//! Structured draft built from the guide's answers

use super::sequencer::StepSequencer;
use super::turn::Turn;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Draft field a scripted step fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    AppType,
    StartingPoint,
    Components,
    Dependencies,
    Inputs,
    Day2Actions,
    TargetEnvironment,
}

impl DraftField {
    fn is_list(self) -> bool {
        matches!(
            self,
            DraftField::Components
                | DraftField::Dependencies
                | DraftField::Inputs
                | DraftField::Day2Actions
        )
    }
}

/// Blueprint-like specification draft
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintDraft {
    pub app_type: String,
    pub starting_point: String,
    pub components: Vec<String>,
    pub dependencies: Vec<String>,
    pub inputs: Vec<String>,
    pub day2_actions: Vec<String>,
    pub target_environment: String,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write draft: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode draft: {0}")]
    Json(#[from] serde_json::Error),
}

impl BlueprintDraft {
    /// Rebuild the draft from the user turns in a log.
    ///
    /// Later answers to the same step win, so a retried submission replaces
    /// the earlier one.
    pub fn from_turns(turns: &[Turn], sequencer: &StepSequencer) -> Self {
        let mut draft = Self::default();
        for turn in turns.iter().filter(|t| t.is_user()) {
            let Some(step) = turn.step.and_then(|s| sequencer.step(s)) else {
                continue;
            };
            draft.apply(step.field, turn);
        }
        draft
    }

    fn apply(&mut self, field: DraftField, turn: &Turn) {
        if field.is_list() {
            let items = if turn.picked.is_empty() {
                parse_list(&turn.content)
            } else {
                turn.picked.clone()
            };
            match field {
                DraftField::Components => self.components = items,
                DraftField::Dependencies => self.dependencies = items,
                DraftField::Inputs => self.inputs = items,
                DraftField::Day2Actions => self.day2_actions = items,
                _ => {}
            }
            return;
        }

        let text = if turn.picked.is_empty() {
            turn.content.trim().to_string()
        } else {
            turn.picked.join(", ")
        };
        match field {
            DraftField::AppType => self.app_type = text,
            DraftField::StartingPoint => self.starting_point = text,
            DraftField::TargetEnvironment => self.target_environment = text,
            _ => {}
        }
    }

    pub fn to_markdown(&self) -> String {
        let lines = [
            "# Spec Draft".to_string(),
            String::new(),
            format!("- App type: {}", or_tbd(&self.app_type)),
            format!("- Starting point: {}", or_tbd(&self.starting_point)),
            format!("- Components: {}", or_tbd(&self.components.join(", "))),
            format!("- Dependencies: {}", or_tbd(&self.dependencies.join(", "))),
            format!("- Inputs: {}", or_tbd(&self.inputs.join(", "))),
            format!("- Day-2 actions: {}", or_tbd(&self.day2_actions.join(", "))),
            format!("- Target environment: {}", or_tbd(&self.target_environment)),
        ];
        lines.join("\n")
    }
}

fn or_tbd(value: &str) -> &str {
    if value.is_empty() {
        "TBD"
    } else {
        value
    }
}

/// Split a free-text answer into list items.
///
/// Uses the first separator present, in order: comma, semicolon, " and ".
pub fn parse_list(value: &str) -> Vec<String> {
    if value.trim().is_empty() {
        return Vec::new();
    }
    let parts: Vec<&str> = if value.contains(',') {
        value.split(',').collect()
    } else if value.contains(';') {
        value.split(';').collect()
    } else if value.contains(" and ") {
        value.split(" and ").collect()
    } else {
        vec![value]
    };
    parts
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Write the draft as timestamped JSON and Markdown files into `dir`
pub fn export_draft(draft: &BlueprintDraft, dir: &Path) -> Result<(PathBuf, PathBuf), ExportError> {
    std::fs::create_dir_all(dir)?;
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let json_path = dir.join(format!("spec_{stamp}.json"));
    let md_path = dir.join(format!("spec_{stamp}.md"));

    std::fs::write(&json_path, serde_json::to_string_pretty(draft)?)?;
    std::fs::write(&md_path, draft.to_markdown())?;

    tracing::info!(json = %json_path.display(), markdown = %md_path.display(), "Draft exported");
    Ok((json_path, md_path))
}
