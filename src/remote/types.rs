//! Typed request/response shapes of the suggestion service

use crate::guide::Evidence;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Step label reported by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepLabel(String);

/// Label the service uses once it considers the draft finished
pub const COMPLETE_STEP: &str = "complete";

impl StepLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_complete(&self) -> bool {
        self.0 == COMPLETE_STEP
    }
}

/// Answer to `create_session`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionOpening {
    pub session_id: String,
    pub reply: Option<String>,
    pub evidence: Vec<Evidence>,
    pub draft_snapshot: Option<Value>,
    pub step: StepLabel,
}

/// Answer to `send_turn` and `reset_session`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReply {
    pub reply: Option<String>,
    pub evidence: Vec<Evidence>,
    pub draft_snapshot: Option<Value>,
    pub step: StepLabel,
}

impl TurnReply {
    pub fn into_opening(self, session_id: impl Into<String>) -> SessionOpening {
        SessionOpening {
            session_id: session_id.into(),
            reply: self.reply,
            evidence: self.evidence,
            draft_snapshot: self.draft_snapshot,
            step: self.step,
        }
    }
}

/// Answer to `evaluate_variant`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantReply {
    pub reply: String,
    pub evidence: Vec<Evidence>,
    pub draft_snapshot: Option<Value>,
}
