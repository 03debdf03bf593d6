use std::collections::HashMap;
use std::time::Instant;

use tally_core::service::{ServiceActionDelta, ServiceStatus};
use tally_net::{ChatReply, ConnState};

use crate::vram::VramUpdate;

/// Everything that can change assistant console state. Events are facts;
/// the reducer decides what they mean for the state.
#[derive(Debug, Clone)]
pub enum AssistantEvent {
    // --- Boot sequence ---
    StatusesLoaded {
        statuses: HashMap<String, ServiceStatus>,
    },
    ProbeFailed {
        detail: String,
    },
    SequenceStarted,
    ServiceStarting {
        id: String,
    },
    ServiceStarted {
        id: String,
    },
    ServiceFailed {
        id: String,
        critical: bool,
        detail: String,
        at: Instant,
    },
    SequenceFinished,

    // --- Event stream ---
    Conn(ConnState),
    EmotionChanged {
        emotion: String,
    },
    ServiceDelta(ServiceActionDelta),

    // --- Chat ---
    MessageSent {
        text: String,
    },
    ReplyReceived(ChatReply),
    ChatRejected {
        detail: String,
        at: Instant,
    },
    GatewayUnreachable {
        at: Instant,
    },
    TranscriptReady {
        text: String,
    },
    TranscriptFailed {
        detail: String,
        at: Instant,
    },
    SttUnavailable {
        at: Instant,
    },

    // --- VRAM guard ---
    VramObserved {
        update: VramUpdate,
        at: Instant,
    },
    VramUnreadable,
}
