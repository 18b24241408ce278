//! Guide session state

use super::sequencer::StepSequencer;
use super::turn::{NewTurn, TurnId, TurnLog};
use crate::remote::SessionOpening;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// First turn of every session
pub const INTRO_MESSAGE: &str = "Guide mode: let's draft a blueprint-like spec.";

/// System turn appended once the last step is answered
pub const COMPLETION_MESSAGE: &str = "Blueprint summary ready. Your draft is complete.";

/// Default bound on trimmed user input, in characters
pub const DEFAULT_MAX_INPUT_CHARS: usize = 500;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidePhase {
    /// Waiting for the answer to `step_index`
    Collecting,
    /// A user turn was appended and the remote reply is in flight, or a
    /// reset is restarting the remote session
    AwaitingReply,
    /// Terminal step reached
    Complete,
}

/// A committed user turn whose remote reply has not landed yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    pub user_turn: TurnId,
    pub answered_step: usize,
}

/// Conversation session, owned by exactly one runtime
#[derive(Debug, Clone, Default)]
pub struct GuideSession {
    pub turns: TurnLog,
    pub step_index: usize,
    pub complete: bool,
    pub last_error: Option<String>,
    pub pending: Option<PendingTurn>,
    /// Set while a reset waits on the remote service
    pub resetting: bool,
    /// Session id on the remote service, once one exists
    pub remote_session_id: Option<String>,
    /// Latest draft snapshot the remote service sent back
    pub remote_draft: Option<Value>,
}

impl GuideSession {
    /// Fresh session at step 0: intro turn, optional remote greeting, first prompt
    pub fn start(sequencer: &StepSequencer, opening: Option<&SessionOpening>) -> Self {
        let mut session = Self::default();
        session.turns.append(NewTurn::assistant(INTRO_MESSAGE));

        if let Some(opening) = opening {
            session.remote_session_id = Some(opening.session_id.clone());
            session.remote_draft.clone_from(&opening.draft_snapshot);
            if let Some(reply) = &opening.reply {
                session
                    .turns
                    .append(NewTurn::assistant(reply.clone()).with_evidence(opening.evidence.clone()));
            }
        }

        if let Some(spec) = sequencer.next(0) {
            session.turns.append(spec.to_turn(0));
        }
        session
    }

    pub fn phase(&self) -> GuidePhase {
        if self.complete {
            GuidePhase::Complete
        } else if self.is_busy() {
            GuidePhase::AwaitingReply
        } else {
            GuidePhase::Collecting
        }
    }

    /// A remote round trip owns the session
    pub fn is_busy(&self) -> bool {
        self.pending.is_some() || self.resetting
    }

    /// Id of the prompt turn currently accepting option commits
    pub fn active_prompt(&self) -> Option<TurnId> {
        if self.complete {
            return None;
        }
        self.turns.prompt_for(self.step_index).map(|turn| turn.id)
    }
}

/// Per-session context that does not change across transitions
#[derive(Debug, Clone)]
pub struct GuideContext {
    pub session_id: String,
    pub sequencer: Arc<StepSequencer>,
    pub max_input_chars: usize,
    /// Whether commits round-trip through the remote service
    pub remote_enabled: bool,
}

impl GuideContext {
    pub fn new(session_id: impl Into<String>, sequencer: Arc<StepSequencer>) -> Self {
        Self {
            session_id: session_id.into(),
            sequencer,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            remote_enabled: false,
        }
    }

    #[must_use]
    pub fn with_remote(mut self) -> Self {
        self.remote_enabled = true;
        self
    }

    #[must_use]
    pub fn with_max_input(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }
}
