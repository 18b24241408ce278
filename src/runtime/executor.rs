//! Guide runtime executor
//!
//! Feeds events through the pure transition function and executes the
//! resulting effects. The session lock is never held across a remote call;
//! the `AwaitingReply` phase is what keeps a second commit out meanwhile.
//!
//! Every command that may reach the remote service runs on its own task.
//! A caller that goes away mid-call detaches from that task, so the reply
//! (or the failure) still lands and the session never stays busy.

use crate::guide::{
    transition, BlueprintDraft, Effect, Event, GuideContext, GuidePhase, GuideSession,
    StepSequencer, TransitionError, Turn, TurnId,
};
use crate::lab::LabContext;
use crate::remote::{RemoteError, SessionOpening, SuggestionService};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Read-only view of a guide session
#[derive(Debug, Clone, Serialize)]
pub struct GuideSnapshot {
    pub session_id: String,
    pub phase: GuidePhase,
    pub step_index: usize,
    pub terminal_index: usize,
    pub complete: bool,
    pub last_error: Option<String>,
    pub remote_session_id: Option<String>,
    /// Prompt turn whose options are currently interactive
    pub active_prompt: Option<TurnId>,
    pub turns: Vec<Turn>,
    pub draft: BlueprintDraft,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_draft: Option<Value>,
}

/// State shared between the runtime handle and its spawned command tasks
struct SessionCore {
    context: GuideContext,
    session: Mutex<GuideSession>,
    service: Option<Arc<dyn SuggestionService>>,
}

/// Single mutation entry point for one guide session
pub struct GuideRuntime {
    core: Arc<SessionCore>,
}

impl GuideRuntime {
    /// Start a session, opening a remote session first when a service is attached.
    ///
    /// A failed opening still yields a usable session; it records the error
    /// and stays not-ready until `reset` succeeds.
    pub async fn start(context: GuideContext, service: Option<Arc<dyn SuggestionService>>) -> Self {
        let opening = match &service {
            Some(service) => Some(service.create_session().await),
            None => None,
        };
        let session = fresh_session(&context.sequencer, opening);
        tracing::info!(
            session_id = %context.session_id,
            remote_session_id = ?session.remote_session_id,
            "Guide session started"
        );

        Self {
            core: Arc::new(SessionCore {
                context,
                session: Mutex::new(session),
                service,
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.core.context.session_id
    }

    // ==================== Commands ====================

    pub async fn submit_text(&self, raw: impl Into<String>) -> Result<GuideSnapshot, TransitionError> {
        self.dispatch(Event::UserText { raw: raw.into() }).await
    }

    pub async fn submit_option(
        &self,
        turn_id: TurnId,
        option_id: impl Into<String>,
    ) -> Result<GuideSnapshot, TransitionError> {
        self.dispatch(Event::PickOption {
            turn_id,
            option_id: option_id.into(),
        })
        .await
    }

    pub async fn toggle_option(
        &self,
        turn_id: TurnId,
        option_id: impl Into<String>,
    ) -> Result<GuideSnapshot, TransitionError> {
        self.dispatch(Event::ToggleOption {
            turn_id,
            option_id: option_id.into(),
        })
        .await
    }

    pub async fn confirm_selection(&self, turn_id: TurnId) -> Result<GuideSnapshot, TransitionError> {
        self.dispatch(Event::ConfirmSelection { turn_id }).await
    }

    pub async fn go_back(&self) -> Result<GuideSnapshot, TransitionError> {
        self.dispatch(Event::GoBack).await
    }

    /// Rebuild the session from scratch, restarting the remote session too.
    ///
    /// The session is claimed before the remote call, so commits arriving
    /// meanwhile get `Busy` instead of being overwritten.
    pub async fn reset(&self) -> Result<GuideSnapshot, TransitionError> {
        let remote_id = {
            let mut session = self.core.session.lock().unwrap();
            if session.is_busy() {
                return Err(TransitionError::Busy);
            }
            session.resetting = true;
            session.remote_session_id.clone()
        };

        let core = Arc::clone(&self.core);
        detached(self.session_id(), async move {
            core.restart(remote_id).await;
            Ok(())
        })
        .await?;
        Ok(self.snapshot())
    }

    /// Run one event and every follow-up event its effects produce
    pub async fn dispatch(&self, event: Event) -> Result<GuideSnapshot, TransitionError> {
        let core = Arc::clone(&self.core);
        detached(self.session_id(), async move { core.process_event(event).await }).await?;
        Ok(self.snapshot())
    }

    // ==================== Queries ====================

    pub fn snapshot(&self) -> GuideSnapshot {
        let context = &self.core.context;
        let session = self.core.session.lock().unwrap();
        GuideSnapshot {
            session_id: context.session_id.clone(),
            phase: session.phase(),
            step_index: session.step_index,
            terminal_index: context.sequencer.terminal_index(),
            complete: session.complete,
            last_error: session.last_error.clone(),
            remote_session_id: session.remote_session_id.clone(),
            active_prompt: session.active_prompt(),
            turns: session.turns.turns().to_vec(),
            draft: BlueprintDraft::from_turns(session.turns.turns(), &context.sequencer),
            remote_draft: session.remote_draft.clone(),
        }
    }

    pub fn draft(&self) -> BlueprintDraft {
        let session = self.core.session.lock().unwrap();
        BlueprintDraft::from_turns(session.turns.turns(), &self.core.context.sequencer)
    }

    /// What the comparison lab needs, once a remote session and a user message exist
    pub fn lab_context(&self) -> Option<LabContext> {
        let session = self.core.session.lock().unwrap();
        Some(LabContext {
            session_id: session.remote_session_id.clone()?,
            message: session.turns.last_user_message()?.to_string(),
        })
    }
}

impl SessionCore {
    // ==================== Event loop ====================

    async fn process_event(&self, event: Event) -> Result<(), TransitionError> {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let effects = {
                let mut session = self.session.lock().unwrap();
                let result = transition(&session, &self.context, event)?;
                *session = result.new_state;
                result.effects
            };

            for effect in effects {
                if let Some(next) = self.execute_effect(effect).await {
                    queue.push_back(next);
                }
            }
        }
        Ok(())
    }

    async fn execute_effect(&self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::RequestReply {
                session_id,
                message,
            } => {
                let Some(service) = &self.service else {
                    return Some(Event::RemoteFailed {
                        message: "No suggestion service is configured".to_string(),
                    });
                };
                match service.send_turn(&session_id, &message).await {
                    Ok(reply) => Some(Event::RemoteReply { reply }),
                    Err(e) => {
                        tracing::warn!(
                            session_id = %self.context.session_id,
                            error = %e,
                            retryable = e.kind.is_retryable(),
                            "Remote turn failed"
                        );
                        Some(Event::RemoteFailed { message: e.message })
                    }
                }
            }
            Effect::GuideCompleted => {
                tracing::info!(session_id = %self.context.session_id, "Guide completed");
                None
            }
            Effect::SelectionIgnored {
                turn_id,
                option_id,
                max,
            } => {
                tracing::debug!(turn_id, option_id = %option_id, max, "Selection cap reached");
                None
            }
        }
    }

    /// Replace the claimed session with a fresh one
    async fn restart(&self, remote_id: Option<String>) {
        let opening = match (&self.service, remote_id) {
            (Some(service), Some(id)) => Some(
                service
                    .reset_session(&id)
                    .await
                    .map(|reply| reply.into_opening(id)),
            ),
            (Some(service), None) => Some(service.create_session().await),
            (None, _) => None,
        };

        let session = fresh_session(&self.context.sequencer, opening);
        *self.session.lock().unwrap() = session;
        tracing::info!(session_id = %self.context.session_id, "Guide session reset");
    }
}

/// Run `work` on its own task and wait for it; dropping the caller does not cancel it
async fn detached<F>(session_id: &str, work: F) -> Result<(), TransitionError>
where
    F: Future<Output = Result<(), TransitionError>> + Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, "Guide command task failed");
            Err(TransitionError::InvalidTransition(format!(
                "command task failed: {e}"
            )))
        }
    }
}

fn fresh_session(
    sequencer: &StepSequencer,
    opening: Option<Result<SessionOpening, RemoteError>>,
) -> GuideSession {
    match opening {
        Some(Ok(opening)) => GuideSession::start(sequencer, Some(&opening)),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Could not open remote session");
            let mut session = GuideSession::start(sequencer, None);
            session.last_error = Some(e.message);
            session
        }
        None => GuideSession::start(sequencer, None),
    }
}
