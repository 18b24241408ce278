//! Pure state transition function
//!
//! Every user action is validated before anything changes: a rejected event
//! returns an error and the caller keeps its old state. Remote round-trips are
//! split into a commit (user turn appended, reply requested) and a later
//! `RemoteReply`/`RemoteFailed` event.

use super::effect::Effect;
use super::event::Event;
use super::selection::{self, SelectionError};
use super::state::{GuideContext, GuideSession, PendingTurn, COMPLETION_MESSAGE};
use super::turn::{NewTurn, Turn, TurnId};
use crate::remote::TurnReply;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: GuideSession,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: GuideSession) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Please enter a message.")]
    EmptyInput,
    #[error("Message is too long (max {max} characters).")]
    InputTooLong { max: usize },
    #[error("A reply is still in flight")]
    Busy,
    #[error("The draft is already complete")]
    AlreadyComplete,
    #[error("Session is not ready yet")]
    SessionNotReady,
    #[error("Unknown turn: {0}")]
    UnknownTurn(TurnId),
    #[error("Turn {0} is no longer the active prompt")]
    StaleTurn(TurnId),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl TransitionError {
    /// Rejections caused by the input itself rather than session timing
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TransitionError::EmptyInput
                | TransitionError::InputTooLong { .. }
                | TransitionError::AlreadyComplete
                | TransitionError::StaleTurn(_)
                | TransitionError::Selection(_)
        )
    }
}

/// Pure transition function
///
/// Given the same state, context and event, always produces the same new
/// state and effects, with no I/O.
pub fn transition(
    state: &GuideSession,
    context: &GuideContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        // ============================================================
        // Commits
        // ============================================================
        Event::UserText { raw } => {
            ensure_accepting(state)?;
            let text = validate_text(&raw, context.max_input_chars)?;
            ensure_ready(state, context)?;

            let mut new_state = state.clone();
            let effects = commit(&mut new_state, context, text, Vec::new());
            Ok(TransitionResult::new(new_state).with_effects(effects))
        }

        Event::PickOption { turn_id, option_id } => {
            ensure_accepting(state)?;
            ensure_active(state, turn_id)?;
            ensure_ready(state, context)?;

            let mut new_state = state.clone();
            let turn = active_turn_mut(&mut new_state, turn_id)?;
            let content = selection::commit_single(turn, &option_id)?;
            let picked = turn
                .options
                .iter()
                .flatten()
                .filter(|option| option.id == option_id)
                .map(|option| option.label.clone())
                .collect();

            let effects = commit(&mut new_state, context, content, picked);
            Ok(TransitionResult::new(new_state).with_effects(effects))
        }

        Event::ToggleOption { turn_id, option_id } => {
            ensure_accepting(state)?;
            ensure_active(state, turn_id)?;

            let mut new_state = state.clone();
            let deck = active_turn_mut(&mut new_state, turn_id)?
                .multi_select
                .as_mut()
                .ok_or(SelectionError::NoOptions)?;

            match selection::toggle_multi(deck, &option_id) {
                Ok(_) => Ok(TransitionResult::new(new_state)),
                // Cap rejections are silent: the deck is unchanged
                Err(SelectionError::SelectionCapReached { max }) => {
                    Ok(TransitionResult::new(state.clone()).with_effect(
                        Effect::SelectionIgnored {
                            turn_id,
                            option_id,
                            max,
                        },
                    ))
                }
                Err(e) => Err(e.into()),
            }
        }

        Event::ConfirmSelection { turn_id } => {
            ensure_accepting(state)?;
            ensure_active(state, turn_id)?;

            let mut new_state = state.clone();
            let deck = active_turn_mut(&mut new_state, turn_id)?
                .multi_select
                .as_ref()
                .ok_or(SelectionError::NoOptions)?;
            let content = selection::confirm_multi(deck)?;
            let picked = deck
                .selected_options()
                .map(|option| option.label.clone())
                .collect();
            ensure_ready(state, context)?;

            let effects = commit(&mut new_state, context, content, picked);
            Ok(TransitionResult::new(new_state).with_effects(effects))
        }

        // ============================================================
        // Back-navigation
        // ============================================================
        Event::GoBack => {
            if state.is_busy() || state.step_index == 0 {
                return Ok(TransitionResult::new(state.clone()));
            }
            let mut new_state = state.clone();
            if !new_state.turns.truncate_last_user() {
                return Ok(TransitionResult::new(state.clone()));
            }
            new_state.step_index -= 1;
            new_state.complete = false;
            new_state.last_error = None;
            reopen_active_prompt(&mut new_state);
            Ok(TransitionResult::new(new_state))
        }

        // ============================================================
        // Remote outcomes
        // ============================================================
        Event::RemoteReply { reply } => {
            let mut new_state = state.clone();
            let pending = new_state.pending.take().ok_or_else(|| {
                TransitionError::InvalidTransition("reply arrived with no pending turn".to_string())
            })?;
            let effects = reconcile_reply(&mut new_state, context, &pending, reply);
            Ok(TransitionResult::new(new_state).with_effects(effects))
        }

        Event::RemoteFailed { message } => {
            let mut new_state = state.clone();
            if new_state.pending.take().is_none() {
                return Err(TransitionError::InvalidTransition(
                    "failure arrived with no pending turn".to_string(),
                ));
            }
            // The user turn stays; reopening the prompt lets the user resubmit
            new_state.last_error = Some(message);
            reopen_active_prompt(&mut new_state);
            Ok(TransitionResult::new(new_state))
        }
    }
}

// ============================================================================
// Guards
// ============================================================================

fn ensure_accepting(state: &GuideSession) -> Result<(), TransitionError> {
    if state.complete {
        return Err(TransitionError::AlreadyComplete);
    }
    if state.is_busy() {
        return Err(TransitionError::Busy);
    }
    Ok(())
}

fn ensure_ready(state: &GuideSession, context: &GuideContext) -> Result<(), TransitionError> {
    if context.remote_enabled && state.remote_session_id.is_none() {
        return Err(TransitionError::SessionNotReady);
    }
    Ok(())
}

fn ensure_active(state: &GuideSession, turn_id: TurnId) -> Result<(), TransitionError> {
    if state.turns.get(turn_id).is_none() {
        return Err(TransitionError::UnknownTurn(turn_id));
    }
    if state.active_prompt() != Some(turn_id) {
        return Err(TransitionError::StaleTurn(turn_id));
    }
    Ok(())
}

fn active_turn_mut(state: &mut GuideSession, turn_id: TurnId) -> Result<&mut Turn, TransitionError> {
    state
        .turns
        .get_mut(turn_id)
        .ok_or(TransitionError::UnknownTurn(turn_id))
}

/// Trim and bound free text; the bound counts chars, not bytes
fn validate_text(raw: &str, max: usize) -> Result<String, TransitionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TransitionError::EmptyInput);
    }
    if trimmed.chars().count() > max {
        return Err(TransitionError::InputTooLong { max });
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// Sequencing
// ============================================================================

/// Append the user turn, then either request a reply or advance locally
fn commit(
    state: &mut GuideSession,
    context: &GuideContext,
    content: String,
    picked: Vec<String>,
) -> Vec<Effect> {
    let answered_step = state.step_index;
    let user_turn = state.turns.append(
        NewTurn::user(content.clone())
            .at_step(answered_step)
            .with_picked(picked),
    );
    state.last_error = None;

    match (&state.remote_session_id, context.remote_enabled) {
        (Some(remote_id), true) => {
            let effect = Effect::request_reply(remote_id.clone(), content);
            state.pending = Some(PendingTurn {
                user_turn,
                answered_step,
            });
            vec![effect]
        }
        _ => advance(state, context, answered_step, false),
    }
}

fn reconcile_reply(
    state: &mut GuideSession,
    context: &GuideContext,
    pending: &PendingTurn,
    reply: TurnReply,
) -> Vec<Effect> {
    let remote_complete = reply.step.is_complete();
    if let Some(text) = reply.reply {
        state
            .turns
            .append(NewTurn::assistant(text).with_evidence(reply.evidence));
    }
    if reply.draft_snapshot.is_some() {
        state.remote_draft = reply.draft_snapshot;
    }
    advance(state, context, pending.answered_step, remote_complete)
}

/// Move past `answered_step`, appending the next prompt or the completion turn
fn advance(
    state: &mut GuideSession,
    context: &GuideContext,
    answered_step: usize,
    remote_complete: bool,
) -> Vec<Effect> {
    let sequencer = &context.sequencer;
    state.step_index = (answered_step + 1).min(sequencer.terminal_index());

    if remote_complete || sequencer.is_terminal(state.step_index) {
        state.complete = true;
        state.turns.append(NewTurn::system(COMPLETION_MESSAGE));
        return vec![Effect::GuideCompleted];
    }

    if let Some(spec) = sequencer.next(state.step_index) {
        state.turns.append(spec.to_turn(state.step_index));
    }
    vec![]
}

/// Make the active prompt's options interactive again after a redo
fn reopen_active_prompt(state: &mut GuideSession) {
    let Some(id) = state.active_prompt() else {
        return;
    };
    if let Some(turn) = state.turns.get_mut(id) {
        turn.options_visible = turn.options.is_some();
    }
}
