//! Narrow interface to the host's speech services.
//!
//! Platforms deliver results asynchronously through the sinks handed to them.
//! Every sink is stamped with the recognition generation or synthesis request
//! it belongs to, so the adapter can drop results from operations it already
//! stopped or replaced.

use tokio::sync::mpsc;

use crate::config::SynthesisSettings;
use crate::error::VoiceResult;

/// Raw events arriving from the platform, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    Recognition { generation: u64, event: RecognitionEvent },
    Synthesis { request: u64, event: SynthesisEvent },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Partial hypothesis, may still change.
    Interim(String),
    /// Finalized text for the utterance.
    Final(String),
    Error(String),
    /// The platform stopped recognizing on its own.
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEvent {
    Started,
    Finished,
    Failed(String),
}

/// Where a recognizer reports results for one listening session.
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    generation: u64,
    tx: mpsc::UnboundedSender<VoiceEvent>,
}

impl RecognitionSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<VoiceEvent>) -> Self {
        Self { generation, tx }
    }

    /// Returns false once the adapter is gone.
    pub fn send(&self, event: RecognitionEvent) -> bool {
        self.tx
            .send(VoiceEvent::Recognition {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    pub fn interim(&self, text: impl Into<String>) -> bool {
        self.send(RecognitionEvent::Interim(text.into()))
    }

    pub fn final_result(&self, text: impl Into<String>) -> bool {
        self.send(RecognitionEvent::Final(text.into()))
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.send(RecognitionEvent::Error(message.into()))
    }

    pub fn ended(&self) -> bool {
        self.send(RecognitionEvent::Ended)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Where a synthesizer reports progress for one request.
#[derive(Debug, Clone)]
pub struct SynthesisSink {
    request: u64,
    tx: mpsc::UnboundedSender<VoiceEvent>,
}

impl SynthesisSink {
    pub(crate) fn new(request: u64, tx: mpsc::UnboundedSender<VoiceEvent>) -> Self {
        Self { request, tx }
    }

    pub fn send(&self, event: SynthesisEvent) -> bool {
        self.tx
            .send(VoiceEvent::Synthesis {
                request: self.request,
                event,
            })
            .is_ok()
    }

    pub fn started(&self) -> bool {
        self.send(SynthesisEvent::Started)
    }

    pub fn finished(&self) -> bool {
        self.send(SynthesisEvent::Finished)
    }

    pub fn failed(&self, message: impl Into<String>) -> bool {
        self.send(SynthesisEvent::Failed(message.into()))
    }

    pub fn request(&self) -> u64 {
        self.request
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOptions {
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
}

impl RecognitionOptions {
    pub fn for_language(language: &str) -> Self {
        Self {
            language: language.to_string(),
            continuous: true,
            interim_results: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub id: u64,
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub language: String,
    /// Platform voice name; `None` means the platform default.
    pub voice: Option<String>,
}

impl SynthesisRequest {
    pub fn new(
        id: u64,
        text: impl Into<String>,
        settings: &SynthesisSettings,
        voice: Option<String>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            rate: settings.rate,
            pitch: settings.pitch,
            volume: settings.volume,
            language: settings.language.clone(),
            voice,
        }
    }
}

/// Speech-to-text capability.
pub trait SpeechRecognizer: Send {
    /// Begin a listening session. Results go to `sink` until `stop` is called.
    fn start(&mut self, options: &RecognitionOptions, sink: RecognitionSink) -> VoiceResult<()>;

    /// Stop the current session. Must be safe to call when not started.
    fn stop(&mut self);
}

/// Text-to-speech capability.
pub trait SpeechSynthesizer: Send {
    /// Names of the voices the platform offers.
    fn voices(&self) -> Vec<String> {
        Vec::new()
    }

    /// Begin speaking. Completion or failure is reported through `sink`.
    fn speak(&mut self, request: SynthesisRequest, sink: SynthesisSink) -> VoiceResult<()>;

    /// Cut off any speech in progress. Must be safe to call when silent.
    fn cancel(&mut self);
}

/// What the host offers. Voice works only when both halves are present.
#[derive(Default)]
pub struct SpeechServices {
    pub recognizer: Option<Box<dyn SpeechRecognizer>>,
    pub synthesizer: Option<Box<dyn SpeechSynthesizer>>,
}

impl SpeechServices {
    pub fn new(
        recognizer: Box<dyn SpeechRecognizer>,
        synthesizer: Box<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            recognizer: Some(recognizer),
            synthesizer: Some(synthesizer),
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some() && self.synthesizer.is_some()
    }
}

/// Probes the host for speech services. Called each time voice mode is entered.
pub trait SpeechPlatform {
    fn probe(&self) -> SpeechServices;
}
