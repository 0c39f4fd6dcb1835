//! Error types for the companion engine and its voice adapter.

use thiserror::Error;

use crate::kernel::classifier::ResponseCategory;
use crate::voice::state::VoiceState;

/// Result type alias for turn engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for voice adapter operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Result type alias for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by the text turn engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Empty or whitespace-only submission. Not a fault: nothing changed.
    #[error("input rejected: message is empty")]
    EmptyInput,

    /// A reply is already being composed; input must wait for it.
    #[error("an assistant reply is already being composed")]
    TurnInProgress,

    /// `compose_reply` was invoked with no user turn awaiting an answer.
    #[error("no user turn is awaiting a reply")]
    NoPendingTurn,

    #[error("session has been shut down")]
    SessionClosed,
}

/// Errors surfaced by the voice adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    /// The host has no speech recognition and/or synthesis. Permanent for the adapter.
    #[error("voice features are unavailable on this platform")]
    Unsupported,

    /// The operation is not valid from the current voice state.
    #[error("voice channel is busy ({state})")]
    Busy { state: VoiceState },

    #[error("speech recognition error: {0}")]
    Recognition(String),

    #[error("speech synthesis error: {0}")]
    Synthesis(String),

    /// The platform refused to start an operation.
    #[error("speech platform error: {0}")]
    Platform(String),
}

impl VoiceError {
    /// Content-free classification used by telemetry.
    pub fn fault(&self) -> VoiceFault {
        match self {
            VoiceError::Unsupported => VoiceFault::Unsupported,
            VoiceError::Busy { .. } => VoiceFault::Busy,
            VoiceError::Recognition(_) => VoiceFault::Recognition,
            VoiceError::Synthesis(_) => VoiceFault::Synthesis,
            VoiceError::Platform(_) => VoiceFault::Platform,
        }
    }
}

/// Kind of voice failure, without the platform's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum VoiceFault {
    Unsupported,
    Busy,
    Recognition,
    Synthesis,
    Platform,
}

/// Errors raised while building configuration or response pools.
///
/// These are fatal at startup: a session is never created from an invalid configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("response pool for category `{category}` is empty")]
    EmptyPool { category: ResponseCategory },

    #[error("response pool for category `{category}` contains a blank entry")]
    BlankResponse { category: ResponseCategory },
}
