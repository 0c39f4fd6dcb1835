use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::classifier::ResponseCategory;
use super::event::{EngineEvent, EngineNotice, Originator, Utterance, UtteranceId};
use super::responses::ResponsePool;
use super::scheduler::CompositionScheduler;
use super::selector::{ChoiceSource, Responder};
use super::state::{ConversationState, StateDelta, TurnState};
use super::telemetry::{TelemetryEvent, TelemetryRecorder};
use crate::config::CompositionConfig;
use crate::error::{EngineError, EngineResult};

const NOTICE_CAPACITY: usize = 64;

/// Owns the transcript and the text turn state machine.
///
/// `idle --submit_user_text--> awaiting_assistant --delay elapses--> idle`
///
/// The engine is driven by a single task: the shell calls `submit_user_text`,
/// then keeps feeding `next_event()` results into `handle_event` (or simply
/// awaits `process_next`). Timers never mutate state on their own.
pub struct TurnEngine {
    session_id: Uuid,
    state: ConversationState,
    responder: Responder,
    composition: CompositionConfig,
    scheduler: CompositionScheduler,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
    notices: broadcast::Sender<EngineNotice>,
    pub telemetry: TelemetryRecorder,
    next_id: u64,
    submitted_at: Option<Instant>,
    closed: bool,
}

impl TurnEngine {
    pub fn new(
        pool: Arc<ResponsePool>,
        chooser: Box<dyn ChoiceSource>,
        composition: CompositionConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let session_id = Uuid::new_v4();
        info!(%session_id, delay_ms = composition.delay_ms, "turn engine created");

        Self {
            session_id,
            state: ConversationState::new(),
            responder: Responder::new(pool, chooser),
            composition,
            scheduler: CompositionScheduler::new(),
            events_tx,
            events_rx,
            notices,
            telemetry: TelemetryRecorder::new(),
            next_id: 1,
            submitted_at: None,
            closed: false,
        }
    }

    /// Engine whose transcript opens with an assistant greeting.
    /// A blank greeting seeds nothing.
    pub fn with_greeting(
        pool: Arc<ResponsePool>,
        chooser: Box<dyn ChoiceSource>,
        composition: CompositionConfig,
        greeting: &str,
    ) -> Self {
        let mut engine = Self::new(pool, chooser, composition);
        if greeting.trim().is_empty() {
            return engine;
        }
        let utterance = engine.make_utterance(greeting.to_string(), Originator::Assistant, None);
        if engine.state.reduce(StateDelta::Greeted(utterance.clone())) {
            engine.notify(EngineNotice::UtteranceAppended(utterance));
        }
        engine
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineNotice> {
        self.notices.subscribe()
    }

    /// Accept a user message and start composing the reply.
    ///
    /// Blank input is rejected with no state change. Must be called inside a
    /// tokio runtime because it arms the composition timer.
    pub fn submit_user_text(&mut self, text: &str) -> EngineResult<UtteranceId> {
        if self.closed {
            return Err(EngineError::SessionClosed);
        }
        if text.trim().is_empty() {
            debug!(session_id = %self.session_id, "blank input rejected");
            self.telemetry.record(TelemetryEvent::InputRejected);
            return Err(EngineError::EmptyInput);
        }
        if !self.state.turn().is_idle() {
            warn!(session_id = %self.session_id, "input submitted while a reply is pending");
            return Err(EngineError::TurnInProgress);
        }

        let utterance = self.make_utterance(text.to_string(), Originator::User, None);
        let id = utterance.id;
        let from = self.state.turn();
        self.state.reduce(StateDelta::UserTurnAccepted(utterance.clone()));

        let delay = self.composition_delay();
        self.scheduler.schedule(id, delay, self.events_tx.clone());
        self.submitted_at = Some(Instant::now());

        info!(
            session_id = %self.session_id,
            turn = %id,
            delay_ms = delay.as_millis() as u64,
            "user turn accepted"
        );
        self.telemetry.record(TelemetryEvent::TurnSubmitted { turn: id });
        self.notify(EngineNotice::UtteranceAppended(utterance));
        self.notify(EngineNotice::TurnStateChanged { from, to: self.state.turn() });

        Ok(id)
    }

    /// Classify `for_text`, select a reply, append it and return to idle.
    ///
    /// Normally invoked when the composition delay elapses. Fails with
    /// `NoPendingTurn` when no user turn is waiting, which keeps assistant
    /// utterances from following each other.
    pub fn compose_reply(&mut self, for_text: &str) -> EngineResult<Utterance> {
        if self.closed {
            return Err(EngineError::SessionClosed);
        }
        let from = self.state.turn();
        let TurnState::AwaitingAssistant { turn } = from else {
            return Err(EngineError::NoPendingTurn);
        };
        // A direct call pre-empts the timer.
        self.scheduler.cancel();

        let reply = self.responder.respond(for_text);
        let utterance =
            self.make_utterance(reply.text, Originator::Assistant, Some(reply.category));
        self.state.reduce(StateDelta::ReplyComposed(utterance.clone()));

        let latency_ms = self
            .submitted_at
            .take()
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or_default();
        info!(
            session_id = %self.session_id,
            %turn,
            category = %reply.category,
            latency_ms,
            "assistant reply composed"
        );
        self.telemetry.record(TelemetryEvent::ReplyComposed {
            turn,
            category: reply.category,
            latency_ms,
        });
        self.notify(EngineNotice::UtteranceAppended(utterance.clone()));
        self.notify(EngineNotice::TurnStateChanged { from, to: self.state.turn() });

        Ok(utterance)
    }

    /// Wait for the next timer event. Cancel safe.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.events_rx.recv().await
    }

    /// Apply a timer event. Returns the appended reply, if one was composed.
    pub fn handle_event(&mut self, event: EngineEvent) -> Option<Utterance> {
        match event {
            EngineEvent::CompositionDue { turn } => {
                if self.closed || !self.scheduler.take_due(turn) {
                    debug!(%turn, "discarded stale composition timer");
                    return None;
                }
                let text = self.state.transcript().get(turn)?.text.clone();
                match self.compose_reply(&text) {
                    Ok(utterance) => Some(utterance),
                    Err(e) => {
                        warn!(%turn, "composition skipped: {}", e);
                        None
                    }
                }
            }
        }
    }

    /// Wait for and apply the next timer event.
    pub async fn process_next(&mut self) -> Option<Utterance> {
        let event = self.next_event().await?;
        self.handle_event(event)
    }

    /// End the session. Any pending composition is cancelled and will never
    /// append to the transcript. Idempotent.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(turn) = self.scheduler.shutdown() {
            let from = self.state.turn();
            self.state.reduce(StateDelta::CompositionAbandoned);
            self.telemetry.record(TelemetryEvent::CompositionCancelled { turn });
            self.notify(EngineNotice::TurnStateChanged { from, to: self.state.turn() });
        }
        info!(
            session_id = %self.session_id,
            utterances = self.state.transcript().len(),
            "turn engine shut down"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Read-only snapshot of the transcript.
    pub fn current_transcript(&self) -> Vec<Utterance> {
        self.state.transcript().as_slice().to_vec()
    }

    pub fn current_turn_state(&self) -> TurnState {
        self.state.turn()
    }

    pub fn state_version(&self) -> u64 {
        self.state.version
    }

    pub fn pool(&self) -> &ResponsePool {
        self.responder.pool()
    }

    fn composition_delay(&mut self) -> Duration {
        let jitter = self.responder.selector_mut().jitter(self.composition.jitter_ms);
        self.composition.base_delay() + Duration::from_millis(jitter)
    }

    fn make_utterance(
        &mut self,
        text: String,
        originator: Originator,
        category: Option<ResponseCategory>,
    ) -> Utterance {
        let id = UtteranceId(self.next_id);
        self.next_id += 1;
        Utterance {
            id,
            text,
            originator,
            created_at: Utc::now(),
            category,
        }
    }

    fn notify(&self, notice: EngineNotice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }
}
