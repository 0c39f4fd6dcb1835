//! Voice I/O: speech recognition in, speech synthesis out.

pub mod adapter;
pub mod capability;
pub mod state;

pub use adapter::{VoiceAdapter, VoiceNotice, VoiceSession};
pub use capability::{
    RecognitionEvent, RecognitionOptions, RecognitionSink, SpeechPlatform, SpeechRecognizer,
    SpeechServices, SpeechSynthesizer, SynthesisEvent, SynthesisRequest, SynthesisSink, VoiceEvent,
};
pub use state::{VoiceGraph, VoiceRequest, VoiceState};
