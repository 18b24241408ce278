//! Selection constraint engine
//!
//! Single-choice commits and bounded multi-choice decks. Nothing here knows
//! about sessions or transport; the transition function decides what a
//! rejection means for the conversation.

use super::turn::{ChoiceOption, Turn};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("This turn has no options to choose from")]
    NoOptions,
    #[error("Option not offered on this turn: {0}")]
    UnknownOption(String),
    #[error("An option was already chosen on this turn")]
    AlreadyCommitted,
    #[error("At most {max} selections allowed")]
    SelectionCapReached { max: usize },
    #[error("Select at least one component.")]
    EmptySelection,
}

/// Multi-select deck attached to a turn.
///
/// `selected` is always a subset of the option ids and never larger than
/// `max_selections`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultiSelectState {
    options: Vec<ChoiceOption>,
    selected: BTreeSet<String>,
    max_selections: usize,
}

/// What a successful toggle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

impl MultiSelectState {
    /// Callers guarantee unique option ids and a positive cap; the step
    /// sequencer validates both when a script is built.
    pub(crate) fn new(options: Vec<ChoiceOption>, max_selections: usize) -> Self {
        Self {
            options,
            selected: BTreeSet::new(),
            max_selections,
        }
    }

    pub fn options(&self) -> &[ChoiceOption] {
        &self.options
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn max_selections(&self) -> usize {
        self.max_selections
    }

    pub fn is_selected(&self, option_id: &str) -> bool {
        self.selected.contains(option_id)
    }

    /// Selected options in deck order
    pub fn selected_options(&self) -> impl Iterator<Item = &ChoiceOption> {
        self.options
            .iter()
            .filter(|option| self.selected.contains(&option.id))
    }
}

/// Commit one option on a turn, hiding the turn's options.
///
/// Returns the composed message content.
pub fn commit_single(turn: &mut Turn, option_id: &str) -> Result<String, SelectionError> {
    let options = turn.options.as_ref().ok_or(SelectionError::NoOptions)?;
    if !turn.options_visible {
        return Err(SelectionError::AlreadyCommitted);
    }
    let content = options
        .iter()
        .find(|option| option.id == option_id)
        .map(ChoiceOption::compose)
        .ok_or_else(|| SelectionError::UnknownOption(option_id.to_string()))?;

    turn.options_visible = false;
    Ok(content)
}

/// Toggle one option in a deck.
///
/// Removing is always allowed. Adding past the cap fails with
/// `SelectionCapReached` and leaves the deck unchanged.
pub fn toggle_multi(state: &mut MultiSelectState, option_id: &str) -> Result<Toggle, SelectionError> {
    if !state.options.iter().any(|option| option.id == option_id) {
        return Err(SelectionError::UnknownOption(option_id.to_string()));
    }
    if state.selected.remove(option_id) {
        return Ok(Toggle::Removed);
    }
    if state.selected.len() >= state.max_selections {
        return Err(SelectionError::SelectionCapReached {
            max: state.max_selections,
        });
    }
    state.selected.insert(option_id.to_string());
    Ok(Toggle::Added)
}

/// Compose the message for a confirmed deck, in deck order
pub fn confirm_multi(state: &MultiSelectState) -> Result<String, SelectionError> {
    if state.selected.is_empty() {
        return Err(SelectionError::EmptySelection);
    }
    Ok(state
        .selected_options()
        .map(ChoiceOption::compose)
        .collect::<Vec<_>>()
        .join("\n\n"))
}
