//! A companion session: one text engine plus an optional voice visit.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::CompanionConfig;
use crate::error::{ConfigResult, VoiceError, VoiceResult};
use crate::kernel::engine::TurnEngine;
use crate::kernel::event::{EngineEvent, Utterance};
use crate::kernel::responses::ResponsePool;
use crate::kernel::selector::{ChoiceSource, ThreadRandom};
use crate::kernel::telemetry::{TelemetryRecorder, TelemetrySnapshot};
use crate::voice::{SpeechPlatform, VoiceAdapter, VoiceEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Text,
    Voice,
}

/// Events the session's owner should feed back through `handle`.
#[derive(Debug)]
pub enum SessionEvent {
    Engine(EngineEvent),
    Voice(VoiceEvent),
}

/// Builds choice sources for each new engine or voice visit.
pub type ChooserFactory = Box<dyn Fn() -> Box<dyn ChoiceSource> + Send>;

pub struct CompanionSession {
    config: CompanionConfig,
    pool: Arc<ResponsePool>,
    engine: TurnEngine,
    voice: Option<VoiceAdapter>,
    platform: Box<dyn SpeechPlatform + Send>,
    chooser: ChooserFactory,
    mode: Mode,
    /// Telemetry from voice visits that already ended.
    voice_history: TelemetryRecorder,
}

impl CompanionSession {
    /// Fails if the configured response pool is invalid.
    pub fn new(
        config: CompanionConfig,
        platform: Box<dyn SpeechPlatform + Send>,
    ) -> ConfigResult<Self> {
        let chooser: ChooserFactory = Box::new(|| Box::new(ThreadRandom) as Box<dyn ChoiceSource>);
        Self::with_chooser(config, platform, chooser)
    }

    pub fn with_chooser(
        config: CompanionConfig,
        platform: Box<dyn SpeechPlatform + Send>,
        chooser: ChooserFactory,
    ) -> ConfigResult<Self> {
        let pool = Arc::new(config.response_pool()?);
        let engine = match config.greeting_text() {
            Some(greeting) => {
                TurnEngine::with_greeting(pool.clone(), chooser(), config.composition, greeting)
            }
            None => TurnEngine::new(pool.clone(), chooser(), config.composition),
        };
        info!(
            persona = %config.persona_name,
            session_id = %engine.session_id(),
            "companion session started"
        );

        Ok(Self {
            config,
            pool,
            engine,
            voice: None,
            platform,
            chooser,
            mode: Mode::Text,
            voice_history: TelemetryRecorder::new(),
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn persona_name(&self) -> &str {
        &self.config.persona_name
    }

    pub fn engine(&self) -> &TurnEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TurnEngine {
        &mut self.engine
    }

    pub fn voice(&self) -> Option<&VoiceAdapter> {
        self.voice.as_ref()
    }

    /// The live voice adapter. `Unsupported` outside voice mode.
    pub fn voice_mut(&mut self) -> VoiceResult<&mut VoiceAdapter> {
        self.voice.as_mut().ok_or(VoiceError::Unsupported)
    }

    /// Switch to voice. Probes the platform and builds a fresh voice session.
    /// Returns false when the host cannot do voice; the mode still switches so
    /// the shell can show the unavailable notice.
    pub fn enter_voice_mode(&mut self) -> bool {
        if self.mode == Mode::Voice {
            return self.voice.as_ref().is_some_and(|v| !v.is_unsupported());
        }
        let services = self.platform.probe();
        let adapter = VoiceAdapter::new(
            services,
            self.pool.clone(),
            (self.chooser)(),
            self.config.voice.clone(),
        );
        let supported = !adapter.is_unsupported();
        self.voice = Some(adapter);
        self.mode = Mode::Voice;
        info!(supported, "voice mode entered");
        supported
    }

    /// Switch to text. The voice session is torn down and discarded.
    pub fn enter_text_mode(&mut self) {
        if let Some(mut adapter) = self.voice.take() {
            adapter.shutdown();
            for event in adapter.telemetry.events() {
                self.voice_history.record(event.clone());
            }
        }
        if self.mode != Mode::Text {
            info!("text mode entered");
        }
        self.mode = Mode::Text;
    }

    /// Wait for the next engine timer or platform speech event. Cancel safe.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let engine = &mut self.engine;
        let voice = &mut self.voice;
        tokio::select! {
            Some(event) = engine.next_event() => Some(SessionEvent::Engine(event)),
            Some(event) = next_voice_event(voice) => Some(SessionEvent::Voice(event)),
            else => None,
        }
    }

    /// Apply an event. Returns an assistant reply appended to the transcript, if any.
    pub fn handle(&mut self, event: SessionEvent) -> Option<Utterance> {
        match event {
            SessionEvent::Engine(event) => self.engine.handle_event(event),
            SessionEvent::Voice(event) => {
                if let Some(adapter) = self.voice.as_mut() {
                    adapter.handle_event(event);
                }
                None
            }
        }
    }

    /// End the session: cancel pending composition and any speech.
    pub fn shutdown(&mut self) {
        self.enter_text_mode();
        self.engine.shutdown();
    }

    /// Combined text and voice telemetry for the whole session.
    pub fn telemetry(&self) -> TelemetrySnapshot {
        let mut combined = TelemetryRecorder::new();
        let live_voice = self.voice.iter().flat_map(|v| v.telemetry.events());
        for event in self
            .engine
            .telemetry
            .events()
            .chain(self.voice_history.events())
            .chain(live_voice)
        {
            combined.record(event.clone());
        }
        combined.snapshot()
    }
}

async fn next_voice_event(voice: &mut Option<VoiceAdapter>) -> Option<VoiceEvent> {
    match voice {
        Some(adapter) => adapter.next_event().await,
        None => std::future::pending().await,
    }
}
