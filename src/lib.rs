pub mod config;
pub mod error;
pub mod kernel;
pub mod platform;
pub mod session;
pub mod voice;

// Re-export specific items for convenient access
pub use config::CompanionConfig;
pub use error::{ConfigError, EngineError, VoiceError};
pub use kernel::classifier::{classify, ResponseCategory};
pub use kernel::engine::TurnEngine;
pub use kernel::event::{Originator, Utterance, UtteranceId};
pub use kernel::responses::ResponsePool;
pub use kernel::selector::{
    ChoiceSource, Responder, ScriptedChoice, SeededChoice, Selector, ThreadRandom,
};
pub use kernel::state::TurnState;
pub use session::{CompanionSession, Mode};
pub use voice::{VoiceAdapter, VoiceState};
