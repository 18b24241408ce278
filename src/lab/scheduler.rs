//! Comparison scheduler
//!
//! One evaluation per variant, each in its own task, each reconciled only into
//! its own slot.

use super::registry::VariantSlot;
use crate::remote::SuggestionService;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;

/// What the comparison is about: a remote session and the message to answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabContext {
    pub session_id: String,
    pub message: String,
}

/// How one evaluation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Updated,
    Failed { message: String },
    /// A newer evaluation for the same variant was issued first
    Superseded,
}

/// Per-variant outcomes of a `run_all`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub updated: Vec<String>,
    pub failed: Vec<String>,
    pub superseded: Vec<String>,
}

impl RunSummary {
    fn record(&mut self, variant_id: String, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Updated => self.updated.push(variant_id),
            RunOutcome::Failed { .. } => self.failed.push(variant_id),
            RunOutcome::Superseded => self.superseded.push(variant_id),
        }
    }
}

/// Claim the slot's next sequence number now and return the evaluation.
///
/// Claiming happens before the future is polled, so evaluations issued one
/// after another are ordered even if their tasks start out of order.
pub fn evaluate(
    slot: Arc<VariantSlot>,
    service: Arc<dyn SuggestionService>,
    context: LabContext,
) -> impl Future<Output = RunOutcome> + Send + 'static {
    let ticket = slot.begin();
    async move {
        let seq = ticket.seq;
        let result = tokio::select! {
            () = ticket.cancel.cancelled() => None,
            result = service.evaluate_variant(&context.session_id, &context.message, &ticket.params) => Some(result),
        };

        let outcome = match result {
            None => RunOutcome::Superseded,
            Some(Ok(reply)) => {
                if slot.apply(seq, reply) {
                    RunOutcome::Updated
                } else {
                    RunOutcome::Superseded
                }
            }
            Some(Err(e)) => {
                if slot.fail(seq, &e.message) {
                    RunOutcome::Failed { message: e.message }
                } else {
                    RunOutcome::Superseded
                }
            }
        };

        tracing::debug!(variant_id = %slot.id(), seq, ?outcome, "Variant evaluation finished");
        outcome
    }
}

/// Run one evaluation on its own task so the slot settles even if the
/// caller stops waiting
pub async fn evaluate_detached(
    slot: Arc<VariantSlot>,
    service: Arc<dyn SuggestionService>,
    context: LabContext,
) -> RunOutcome {
    let variant_id = slot.id().to_string();
    match tokio::spawn(evaluate(slot, service, context)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(variant_id = %variant_id, error = %e, "Variant evaluation task failed");
            RunOutcome::Failed {
                message: e.to_string(),
            }
        }
    }
}

/// Evaluate every slot concurrently; completions land in any order.
///
/// The fan-out owns its own task, so abandoning the returned future does not
/// abort the evaluations it started.
pub async fn run_all(
    slots: Vec<Arc<VariantSlot>>,
    service: Arc<dyn SuggestionService>,
    context: LabContext,
) -> RunSummary {
    let session_id = context.session_id.clone();
    match tokio::spawn(fan_out(slots, service, context)).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, "Comparison run task failed");
            RunSummary::default()
        }
    }
}

async fn fan_out(
    slots: Vec<Arc<VariantSlot>>,
    service: Arc<dyn SuggestionService>,
    context: LabContext,
) -> RunSummary {
    let mut tasks = JoinSet::new();
    for slot in slots {
        let variant_id = slot.id().to_string();
        let run = evaluate(slot, Arc::clone(&service), context.clone());
        tasks.spawn(async move { (variant_id, run.await) });
    }

    let mut summary = RunSummary::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((variant_id, outcome)) => summary.record(variant_id, &outcome),
            Err(e) => tracing::error!(error = %e, "Variant evaluation task panicked"),
        }
    }

    tracing::info!(
        session_id = %context.session_id,
        updated = summary.updated.len(),
        failed = summary.failed.len(),
        superseded = summary.superseded.len(),
        "Comparison run finished"
    );
    summary
}
