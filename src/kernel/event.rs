use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::classifier::ResponseCategory;
use super::state::TurnState;

/// Monotonic per-session utterance identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Originator {
    User,
    Assistant,
}

/// One message in the transcript. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub originator: Originator,
    pub created_at: DateTime<Utc>,
    /// Category the reply was drawn from. `None` for user turns and the greeting.
    pub category: Option<ResponseCategory>,
}

impl Utterance {
    pub fn is_user(&self) -> bool {
        self.originator == Originator::User
    }
}

/// Internal events delivered back into the engine by its own timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The composition delay for `turn` elapsed.
    CompositionDue { turn: UtteranceId },
}

/// Change notifications for the presentation shell.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineNotice {
    UtteranceAppended(Utterance),
    TurnStateChanged { from: TurnState, to: TurnState },
}
