use serde::{Deserialize, Serialize};
use std::fmt;

/// Turn state of the voice modality. Independent of the text engine's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VoiceState {
    /// Neither listening nor speaking.
    #[default]
    Idle,
    /// Recognizer running, waiting for a final result.
    Listening,
    /// Final text received; reply being selected. Transient.
    Composing,
    /// Synthesizer playing a reply or a quick-action script.
    Speaking,
}

impl fmt::Display for VoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VoiceState::Idle => "idle",
            VoiceState::Listening => "listening",
            VoiceState::Composing => "composing",
            VoiceState::Speaking => "speaking",
        };
        f.write_str(name)
    }
}

/// Requests for a voice state transition.
/// These are REQUESTS, not forces. The graph validates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceRequest {
    StartListening,
    FinalResult,
    ReplyReady,
    /// Speak a fixed script without listening first.
    SpeakScript,
    SynthesisEnded,
    SynthesisFailed,
    RecognitionFailed,
    StopListening,
    StopSpeaking,
    /// Session teardown: back to idle from anywhere.
    Reset,
}

/// The voice turn-taking graph.
pub struct VoiceGraph;

impl VoiceGraph {
    /// Pure function: (Current State, Request) -> New State
    /// Returns None if the transition is invalid/ignored.
    pub fn transition(current: VoiceState, request: VoiceRequest) -> Option<VoiceState> {
        use VoiceRequest::*;
        use VoiceState::*;

        match (current, request) {
            (Idle, StartListening) => Some(Listening),
            (Idle, SpeakScript) => Some(Speaking),

            (Listening, FinalResult) => Some(Composing),
            (Listening, RecognitionFailed) => Some(Idle),
            (Listening, StopListening) => Some(Idle),

            (Composing, ReplyReady) => Some(Speaking),
            // Synthesizer refused the request.
            (Composing, SynthesisFailed) => Some(Idle),

            (Speaking, SynthesisEnded) => Some(Idle),
            (Speaking, SynthesisFailed) => Some(Idle),
            (Speaking, StopSpeaking) => Some(Idle),

            (Listening | Composing | Speaking, Reset) => Some(Idle),

            _ => None,
        }
    }
}
