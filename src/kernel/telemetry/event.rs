use serde::{Deserialize, Serialize};

use crate::error::VoiceFault;
use crate::kernel::classifier::ResponseCategory;
use crate::kernel::event::UtteranceId;
use crate::voice::state::VoiceState;

// Allowed: IDs, Durations, Counts, Enums
// Forbidden: Text

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    TurnSubmitted {
        turn: UtteranceId,
    },

    InputRejected,

    ReplyComposed {
        turn: UtteranceId,
        category: ResponseCategory,
        latency_ms: u64,
    },

    CompositionCancelled {
        turn: UtteranceId,
    },

    VoiceTransition {
        from: VoiceState,
        to: VoiceState,
    },

    VoiceReply {
        category: ResponseCategory,
    },

    VoiceFault {
        kind: VoiceFault,
    },
}
