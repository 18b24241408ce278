//! Turn log types
//!
//! The log is append/truncate-only. Once appended, a turn only changes in two
//! ways: its option set is hidden when an option is committed, and its
//! multi-select deck records toggles.

use super::selection::MultiSelectState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monotonic turn identifier, unique within a session
pub type TurnId = u64;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A choice offered on a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub label: String,
    pub description: String,
    #[serde(default)]
    pub recommended: bool,
}

impl ChoiceOption {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: description.into(),
            recommended: false,
        }
    }

    #[must_use]
    pub fn recommended(mut self) -> Self {
        self.recommended = true;
        self
    }

    /// Message content sent when this option is committed
    pub fn compose(&self) -> String {
        format!("{}\n{}", self.label, self.description)
    }
}

/// Citation attached to a generated answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub title: String,
    pub source_path: String,
    pub line_range: String,
}

/// One message in the conversation history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
    /// Cleared once, when one of `options` is committed
    pub options_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_select: Option<MultiSelectState>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
    /// Prompt turns: the step they ask. User turns: the step they answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    /// Labels of the options a user turn was committed from
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub picked: Vec<String>,
}

impl Turn {
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// A turn that has not been appended yet
#[derive(Debug, Clone)]
pub struct NewTurn {
    role: Role,
    content: String,
    options: Option<Vec<ChoiceOption>>,
    multi_select: Option<MultiSelectState>,
    evidence: Vec<Evidence>,
    step: Option<usize>,
    picked: Vec<String>,
}

impl NewTurn {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            options: None,
            multi_select: None,
            evidence: Vec::new(),
            step: None,
            picked: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<ChoiceOption>) -> Self {
        self.options = Some(options);
        self
    }

    #[must_use]
    pub fn with_deck(mut self, deck: MultiSelectState) -> Self {
        self.multi_select = Some(deck);
        self
    }

    #[must_use]
    pub fn with_evidence(mut self, evidence: Vec<Evidence>) -> Self {
        self.evidence = evidence;
        self
    }

    #[must_use]
    pub fn at_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    #[must_use]
    pub fn with_picked(mut self, picked: Vec<String>) -> Self {
        self.picked = picked;
        self
    }
}

/// Ordered conversation history
#[derive(Debug, Clone, Default)]
pub struct TurnLog {
    turns: Vec<Turn>,
    last_id: TurnId,
}

impl TurnLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn, assigning the next id
    pub fn append(&mut self, turn: NewTurn) -> TurnId {
        self.last_id += 1;
        let options_visible = turn.options.is_some();
        self.turns.push(Turn {
            id: self.last_id,
            role: turn.role,
            content: turn.content,
            created_at: Utc::now(),
            options: turn.options,
            options_visible,
            multi_select: turn.multi_select,
            evidence: turn.evidence,
            step: turn.step,
            picked: turn.picked,
        });
        self.last_id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: TurnId) -> Option<&mut Turn> {
        self.turns.iter_mut().find(|t| t.id == id)
    }

    /// Latest assistant turn prompting `step`
    pub fn prompt_for(&self, step: usize) -> Option<&Turn> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant && t.step == Some(step))
    }

    pub fn last_user_message(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.is_user())
            .map(|t| t.content.as_str())
    }

    /// Drop the most recent user turn and everything after it.
    ///
    /// Returns false, leaving the log untouched, when there is no user turn.
    pub fn truncate_last_user(&mut self) -> bool {
        match self.turns.iter().rposition(Turn::is_user) {
            Some(index) => {
                self.turns.truncate(index);
                true
            }
            None => false,
        }
    }
}
