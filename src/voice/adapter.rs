use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::capability::{
    RecognitionEvent, RecognitionOptions, RecognitionSink, SpeechRecognizer, SpeechServices,
    SpeechSynthesizer, SynthesisEvent, SynthesisRequest, SynthesisSink, VoiceEvent,
};
use super::state::{VoiceGraph, VoiceRequest, VoiceState};
use crate::config::SynthesisSettings;
use crate::error::{VoiceError, VoiceResult};
use crate::kernel::classifier::ResponseCategory;
use crate::kernel::responses::{ResponsePool, AFFIRMATION, GUIDED_BREATHING};
use crate::kernel::selector::{ChoiceSource, Responder};
use crate::kernel::telemetry::{TelemetryEvent, TelemetryRecorder};

const NOTICE_CAPACITY: usize = 64;

/// Transient per-visit voice data. Rebuilt whenever voice mode is entered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceSession {
    pub state: VoiceState,
    /// Latest interim hypothesis while listening.
    pub partial_text: String,
    /// Last finalized utterance ("You said").
    pub final_text: Option<String>,
    /// Text handed to the synthesizer and not yet finished.
    pub queued_speech: Option<String>,
}

impl VoiceSession {
    pub fn is_listening(&self) -> bool {
        self.state == VoiceState::Listening
    }

    pub fn is_speaking(&self) -> bool {
        self.state == VoiceState::Speaking
    }
}

/// Change notifications for the presentation shell.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceNotice {
    StateChanged { from: VoiceState, to: VoiceState },
    PartialTranscript(String),
    FinalTranscript(String),
    Speaking { text: String, category: Option<ResponseCategory> },
    Fault(VoiceError),
    Unsupported,
}

/// Bridges platform speech events to the classify + select pipeline.
///
/// Keeps its own turn state (`idle, listening, composing, speaking`); spoken
/// exchanges do not enter the text transcript.
pub struct VoiceAdapter {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    synthesizer: Option<Box<dyn SpeechSynthesizer>>,
    unsupported: bool,
    responder: Responder,
    settings: SynthesisSettings,
    voice: Option<String>,
    session: VoiceSession,
    /// Current recognition generation; results stamped otherwise are stale.
    generation: u64,
    /// Current synthesis request id; progress stamped otherwise is stale.
    request: u64,
    events_tx: mpsc::UnboundedSender<VoiceEvent>,
    events_rx: mpsc::UnboundedReceiver<VoiceEvent>,
    notices: broadcast::Sender<VoiceNotice>,
    pub telemetry: TelemetryRecorder,
}

impl VoiceAdapter {
    /// Capability detection happens here, once. Missing recognition or
    /// synthesis makes the adapter permanently unsupported.
    pub fn new(
        services: SpeechServices,
        pool: Arc<ResponsePool>,
        chooser: Box<dyn ChoiceSource>,
        settings: SynthesisSettings,
    ) -> Self {
        let unsupported = !services.is_supported();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let mut telemetry = TelemetryRecorder::new();

        let voice = services
            .synthesizer
            .as_ref()
            .and_then(|s| settings.resolve_voice(&s.voices()));

        if unsupported {
            warn!("speech recognition or synthesis unavailable; voice features disabled");
            telemetry.record(TelemetryEvent::VoiceFault {
                kind: VoiceError::Unsupported.fault(),
            });
        } else {
            info!(voice = ?voice, language = %settings.language, "voice adapter ready");
        }

        Self {
            recognizer: services.recognizer,
            synthesizer: services.synthesizer,
            unsupported,
            responder: Responder::new(pool, chooser),
            settings,
            voice,
            session: VoiceSession::default(),
            generation: 0,
            request: 0,
            events_tx,
            events_rx,
            notices,
            telemetry,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VoiceNotice> {
        self.notices.subscribe()
    }

    pub fn is_unsupported(&self) -> bool {
        self.unsupported
    }

    pub fn state(&self) -> VoiceState {
        self.session.state
    }

    pub fn session(&self) -> &VoiceSession {
        &self.session
    }

    /// Voice chosen from the platform's list, if any preference matched.
    pub fn selected_voice(&self) -> Option<&str> {
        self.voice.as_deref()
    }

    /// Begin listening. A no-op when already listening; rejected while
    /// composing or speaking.
    pub fn start_listening(&mut self) -> VoiceResult<()> {
        self.ensure_supported()?;
        if self.session.state == VoiceState::Listening {
            return Ok(());
        }
        if VoiceGraph::transition(self.session.state, VoiceRequest::StartListening).is_none() {
            return Err(self.busy());
        }
        let Some(recognizer) = self.recognizer.as_mut() else {
            return Err(VoiceError::Unsupported);
        };

        self.generation += 1;
        let sink = RecognitionSink::new(self.generation, self.events_tx.clone());
        let options = RecognitionOptions::for_language(&self.settings.language);
        if let Err(e) = recognizer.start(&options, sink) {
            self.generation += 1;
            self.report(e.clone());
            return Err(e);
        }

        self.session.partial_text.clear();
        self.session.final_text = None;
        self.apply(VoiceRequest::StartListening);
        Ok(())
    }

    /// Stop listening. Idempotent: a no-op unless currently listening.
    pub fn stop_listening(&mut self) -> VoiceResult<()> {
        self.ensure_supported()?;
        if self.session.state != VoiceState::Listening {
            return Ok(());
        }
        self.halt_recognition();
        self.session.partial_text.clear();
        self.apply(VoiceRequest::StopListening);
        Ok(())
    }

    /// Cut off speech. Idempotent: a no-op unless currently speaking.
    pub fn stop_speaking(&mut self) -> VoiceResult<()> {
        self.ensure_supported()?;
        if self.session.state != VoiceState::Speaking {
            return Ok(());
        }
        self.halt_synthesis();
        self.apply(VoiceRequest::StopSpeaking);
        Ok(())
    }

    pub fn speak_guided_breathing(&mut self) -> VoiceResult<()> {
        self.speak_script(GUIDED_BREATHING)
    }

    pub fn speak_affirmation(&mut self) -> VoiceResult<()> {
        self.speak_script(AFFIRMATION)
    }

    /// Speak fixed text from idle.
    pub fn speak_script(&mut self, text: &str) -> VoiceResult<()> {
        self.ensure_supported()?;
        if VoiceGraph::transition(self.session.state, VoiceRequest::SpeakScript).is_none() {
            return Err(self.busy());
        }
        self.begin_synthesis(text.to_string(), None, VoiceRequest::SpeakScript)
    }

    /// Wait for the next platform event. Cancel safe.
    pub async fn next_event(&mut self) -> Option<VoiceEvent> {
        self.events_rx.recv().await
    }

    /// Wait for and apply the next platform event. Returns the resulting state.
    pub async fn process_next(&mut self) -> Option<VoiceState> {
        let event = self.next_event().await?;
        self.handle_event(event);
        Some(self.session.state)
    }

    /// Apply one platform event. Events from stopped or replaced operations are dropped.
    pub fn handle_event(&mut self, event: VoiceEvent) {
        match event {
            VoiceEvent::Recognition { generation, event } => {
                if generation != self.generation || self.session.state != VoiceState::Listening {
                    debug!(
                        generation,
                        current = self.generation,
                        "stale recognition event dropped"
                    );
                    return;
                }
                self.on_recognition(event);
            }
            VoiceEvent::Synthesis { request, event } => {
                if request != self.request || self.session.state != VoiceState::Speaking {
                    debug!(request, current = self.request, "stale synthesis event dropped");
                    return;
                }
                self.on_synthesis(event);
            }
        }
    }

    /// Cancel anything in flight and return to idle. Safe from any state.
    pub fn shutdown(&mut self) {
        match self.session.state {
            VoiceState::Listening => self.halt_recognition(),
            VoiceState::Composing | VoiceState::Speaking => self.halt_synthesis(),
            VoiceState::Idle => {}
        }
        self.apply(VoiceRequest::Reset);
        info!("voice session closed");
    }

    fn on_recognition(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Interim(text) => {
                self.session.partial_text = text.clone();
                self.notify(VoiceNotice::PartialTranscript(text));
            }
            RecognitionEvent::Final(text) => {
                if text.trim().is_empty() {
                    return;
                }
                // Stop the microphone before answering so we never hear ourselves.
                self.halt_recognition();
                self.session.partial_text.clear();
                self.session.final_text = Some(text.clone());
                self.notify(VoiceNotice::FinalTranscript(text.clone()));
                self.apply(VoiceRequest::FinalResult);

                let reply = self.responder.respond(&text);
                info!(category = %reply.category, "voice reply selected");
                self.telemetry.record(TelemetryEvent::VoiceReply {
                    category: reply.category,
                });
                // Failure is already reported and the state is back to idle.
                let _ = self.begin_synthesis(
                    reply.text,
                    Some(reply.category),
                    VoiceRequest::ReplyReady,
                );
            }
            RecognitionEvent::Error(message) => {
                self.halt_recognition();
                self.session.partial_text.clear();
                self.apply(VoiceRequest::RecognitionFailed);
                self.report(VoiceError::Recognition(message));
            }
            RecognitionEvent::Ended => {
                self.generation += 1;
                self.apply(VoiceRequest::StopListening);
            }
        }
    }

    fn on_synthesis(&mut self, event: SynthesisEvent) {
        match event {
            SynthesisEvent::Started => debug!(request = self.request, "synthesis started"),
            SynthesisEvent::Finished => {
                self.request += 1;
                self.session.queued_speech = None;
                self.apply(VoiceRequest::SynthesisEnded);
            }
            SynthesisEvent::Failed(message) => {
                self.request += 1;
                self.session.queued_speech = None;
                self.apply(VoiceRequest::SynthesisFailed);
                self.report(VoiceError::Synthesis(message));
            }
        }
    }

    fn begin_synthesis(
        &mut self,
        text: String,
        category: Option<ResponseCategory>,
        on_accepted: VoiceRequest,
    ) -> VoiceResult<()> {
        let Some(synthesizer) = self.synthesizer.as_mut() else {
            return Err(VoiceError::Unsupported);
        };
        // Replace, never overlap.
        if self.session.queued_speech.take().is_some() {
            synthesizer.cancel();
        }

        self.request += 1;
        let request =
            SynthesisRequest::new(self.request, text.clone(), &self.settings, self.voice.clone());
        let sink = SynthesisSink::new(self.request, self.events_tx.clone());

        match synthesizer.speak(request, sink) {
            Ok(()) => {
                self.session.queued_speech = Some(text.clone());
                self.apply(on_accepted);
                self.notify(VoiceNotice::Speaking { text, category });
                Ok(())
            }
            Err(e) => {
                self.request += 1;
                let e = if matches!(e, VoiceError::Synthesis(_)) {
                    e
                } else {
                    VoiceError::Synthesis(e.to_string())
                };
                self.apply(VoiceRequest::SynthesisFailed);
                self.report(e.clone());
                Err(e)
            }
        }
    }

    fn halt_recognition(&mut self) {
        self.generation += 1;
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
    }

    fn halt_synthesis(&mut self) {
        self.request += 1;
        self.session.queued_speech = None;
        if let Some(synthesizer) = self.synthesizer.as_mut() {
            synthesizer.cancel();
        }
    }

    fn apply(&mut self, request: VoiceRequest) -> bool {
        let from = self.session.state;
        match VoiceGraph::transition(from, request) {
            Some(to) => {
                self.session.state = to;
                info!(%from, %to, "voice state");
                self.telemetry.record(TelemetryEvent::VoiceTransition { from, to });
                self.notify(VoiceNotice::StateChanged { from, to });
                true
            }
            None => {
                debug!(%from, ?request, "voice transition ignored");
                false
            }
        }
    }

    fn ensure_supported(&mut self) -> VoiceResult<()> {
        if self.unsupported {
            self.report(VoiceError::Unsupported);
            return Err(VoiceError::Unsupported);
        }
        Ok(())
    }

    fn busy(&self) -> VoiceError {
        VoiceError::Busy {
            state: self.session.state,
        }
    }

    fn report(&mut self, error: VoiceError) {
        warn!("voice fault: {}", error);
        self.telemetry.record(TelemetryEvent::VoiceFault { kind: error.fault() });
        let notice = match error {
            VoiceError::Unsupported => VoiceNotice::Unsupported,
            other => VoiceNotice::Fault(other),
        };
        self.notify(notice);
    }

    fn notify(&self, notice: VoiceNotice) {
        let _ = self.notices.send(notice);
    }
}
