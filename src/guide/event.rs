//! Events that drive a guide session

use super::turn::TurnId;
use crate::remote::TurnReply;

/// Inputs to the guide transition function
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserText {
        raw: String,
    },
    PickOption {
        turn_id: TurnId,
        option_id: String,
    },
    ToggleOption {
        turn_id: TurnId,
        option_id: String,
    },
    ConfirmSelection {
        turn_id: TurnId,
    },
    GoBack,

    // Remote service events
    RemoteReply {
        reply: TurnReply,
    },
    RemoteFailed {
        message: String,
    },
}
