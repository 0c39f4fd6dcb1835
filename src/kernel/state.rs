use serde::{Deserialize, Serialize};
use std::fmt;

use super::event::{Originator, Utterance, UtteranceId};

/// Turn state of the text modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TurnState {
    #[default]
    Idle,
    /// A user turn was accepted and the reply is being composed.
    AwaitingAssistant { turn: UtteranceId },
}

impl TurnState {
    pub fn is_idle(&self) -> bool {
        matches!(self, TurnState::Idle)
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::Idle => f.write_str("idle"),
            TurnState::AwaitingAssistant { turn } => write!(f, "awaiting_assistant({turn})"),
        }
    }
}

/// Ordered, append-only list of utterances.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    utterances: Vec<Utterance>,
}

impl Transcript {
    pub fn as_slice(&self) -> &[Utterance] {
        &self.utterances
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    pub fn last(&self) -> Option<&Utterance> {
        self.utterances.last()
    }

    pub fn get(&self, id: UtteranceId) -> Option<&Utterance> {
        self.utterances.iter().find(|u| u.id == id)
    }
}

/// Strict state delta. This is the ONLY way conversation state mutates.
#[derive(Debug, Clone)]
pub enum StateDelta {
    /// Seed greeting; only valid on an empty transcript.
    Greeted(Utterance),
    UserTurnAccepted(Utterance),
    ReplyComposed(Utterance),
    /// Pending composition dropped without a reply (session teardown).
    CompositionAbandoned,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    transcript: Transcript,
    turn: TurnState,
    /// Monotonic version, bumped on every reduction.
    pub version: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduction: State + Delta -> Mutated State.
    ///
    /// Returns false (and leaves state untouched) when the delta would break
    /// turn alternation: a reply with no pending user turn, or a user turn while
    /// a reply is pending.
    pub fn reduce(&mut self, delta: StateDelta) -> bool {
        let applied = match delta {
            StateDelta::Greeted(utterance) => {
                if !self.transcript.is_empty() || utterance.originator != Originator::Assistant {
                    false
                } else {
                    self.transcript.utterances.push(utterance);
                    true
                }
            }
            StateDelta::UserTurnAccepted(utterance) => {
                if !self.turn.is_idle() || utterance.originator != Originator::User {
                    false
                } else {
                    self.turn = TurnState::AwaitingAssistant { turn: utterance.id };
                    self.transcript.utterances.push(utterance);
                    true
                }
            }
            StateDelta::ReplyComposed(utterance) => match self.turn {
                TurnState::AwaitingAssistant { .. }
                    if utterance.originator == Originator::Assistant =>
                {
                    self.turn = TurnState::Idle;
                    self.transcript.utterances.push(utterance);
                    true
                }
                _ => false,
            },
            StateDelta::CompositionAbandoned => {
                let was_pending = !self.turn.is_idle();
                self.turn = TurnState::Idle;
                was_pending
            }
        };

        if applied {
            self.version += 1;
        }
        applied
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn turn(&self) -> TurnState {
        self.turn
    }
}
