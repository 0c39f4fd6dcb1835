//! Scripted speech services shared by the voice and session tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use serene::error::{VoiceError, VoiceResult};
use serene::voice::{
    RecognitionOptions, RecognitionSink, SpeechPlatform, SpeechRecognizer, SpeechServices,
    SpeechSynthesizer, SynthesisRequest, SynthesisSink,
};

#[derive(Debug, Default)]
pub struct Probe {
    pub recognition: Option<RecognitionSink>,
    pub options: Option<RecognitionOptions>,
    pub recognizer_starts: usize,
    pub recognizer_stops: usize,
    pub synthesis: Option<SynthesisSink>,
    pub spoken: Vec<SynthesisRequest>,
    pub synthesizer_cancels: usize,
    pub refuse_speech: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeSpeech {
    probe: Arc<Mutex<Probe>>,
    voices: Vec<String>,
}

impl FakeSpeech {
    pub fn new() -> Self {
        Self {
            probe: Arc::default(),
            voices: vec!["Daniel".to_string(), "Samantha".to_string()],
        }
    }

    pub fn probe(&self) -> MutexGuard<'_, Probe> {
        self.probe.lock().unwrap()
    }

    pub fn recognition(&self) -> RecognitionSink {
        self.probe().recognition.clone().expect("recognizer was started")
    }

    pub fn synthesis(&self) -> SynthesisSink {
        self.probe().synthesis.clone().expect("synthesizer was asked to speak")
    }

    pub fn last_spoken(&self) -> SynthesisRequest {
        self.probe().spoken.last().cloned().expect("something was spoken")
    }

    pub fn services(&self) -> SpeechServices {
        SpeechServices::new(
            Box::new(FakeRecognizer { speech: self.clone() }),
            Box::new(FakeSynthesizer { speech: self.clone() }),
        )
    }
}

struct FakeRecognizer {
    speech: FakeSpeech,
}

impl SpeechRecognizer for FakeRecognizer {
    fn start(&mut self, options: &RecognitionOptions, sink: RecognitionSink) -> VoiceResult<()> {
        let mut probe = self.speech.probe();
        probe.recognizer_starts += 1;
        probe.options = Some(options.clone());
        probe.recognition = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        self.speech.probe().recognizer_stops += 1;
    }
}

struct FakeSynthesizer {
    speech: FakeSpeech,
}

impl SpeechSynthesizer for FakeSynthesizer {
    fn voices(&self) -> Vec<String> {
        self.speech.voices.clone()
    }

    fn speak(&mut self, request: SynthesisRequest, sink: SynthesisSink) -> VoiceResult<()> {
        let mut probe = self.speech.probe();
        if probe.refuse_speech {
            return Err(VoiceError::Platform("audio output busy".to_string()));
        }
        probe.spoken.push(request);
        probe.synthesis = Some(sink);
        Ok(())
    }

    fn cancel(&mut self) {
        self.speech.probe().synthesizer_cancels += 1;
    }
}

/// A platform that hands out the fake services, or nothing when `supported` is false.
pub struct FakePlatform {
    pub speech: FakeSpeech,
    pub supported: bool,
}

impl SpeechPlatform for FakePlatform {
    fn probe(&self) -> SpeechServices {
        if self.supported {
            self.speech.services()
        } else {
            SpeechServices::unavailable()
        }
    }
}
