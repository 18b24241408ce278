//! Effects produced by guide transitions

use super::turn::TurnId;

/// Work the runtime performs after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send the committed message to the remote service
    RequestReply { session_id: String, message: String },

    /// The terminal step was reached
    GuideCompleted,

    /// A toggle hit the deck cap and was dropped
    SelectionIgnored {
        turn_id: TurnId,
        option_id: String,
        max: usize,
    },
}

impl Effect {
    pub fn request_reply(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Effect::RequestReply {
            session_id: session_id.into(),
            message: message.into(),
        }
    }
}
