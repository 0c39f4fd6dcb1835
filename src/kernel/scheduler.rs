use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::event::{EngineEvent, UtteranceId};

struct PendingComposition {
    turn: UtteranceId,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Holds at most one delayed reply composition.
///
/// The timer task never touches engine state: when the delay elapses it posts
/// `EngineEvent::CompositionDue` back to the engine's queue. Cancelling the
/// token (or the root token on teardown) stops the task before it posts.
pub struct CompositionScheduler {
    root: CancellationToken,
    pending: Option<PendingComposition>,
}

impl CompositionScheduler {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            pending: None,
        }
    }

    /// Arm the timer for `turn`. Any previous composition is cancelled first.
    /// Must be called from within a tokio runtime.
    pub fn schedule(
        &mut self,
        turn: UtteranceId,
        delay: Duration,
        tx: mpsc::UnboundedSender<EngineEvent>,
    ) {
        self.cancel();

        let token = self.root.child_token();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = task_token.cancelled() => {
                    debug!(%turn, "composition timer cancelled");
                }
                () = sleep(delay) => {
                    let _ = tx.send(EngineEvent::CompositionDue { turn });
                }
            }
        });

        self.pending = Some(PendingComposition { turn, token, handle });
    }

    /// Claim the pending composition if `turn` matches it. Stale timers get false.
    pub fn take_due(&mut self, turn: UtteranceId) -> bool {
        match &self.pending {
            Some(p) if p.turn == turn => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Cancel the pending composition, if any. Returns the cancelled turn.
    pub fn cancel(&mut self) -> Option<UtteranceId> {
        let pending = self.pending.take()?;
        pending.token.cancel();
        pending.handle.abort();
        Some(pending.turn)
    }

    /// Cancel everything, now and for any future `schedule` on this instance.
    pub fn shutdown(&mut self) -> Option<UtteranceId> {
        self.root.cancel();
        self.cancel()
    }

    pub fn pending_turn(&self) -> Option<UtteranceId> {
        self.pending.as_ref().map(|p| p.turn)
    }
}

impl Default for CompositionScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CompositionScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
