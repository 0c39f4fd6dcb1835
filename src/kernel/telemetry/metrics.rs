use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

use super::event::TelemetryEvent;
use crate::error::VoiceFault;
use crate::kernel::classifier::ResponseCategory;
use crate::voice::state::VoiceState;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetrySnapshot {
    pub turn_stats: TurnStats,
    pub voice_stats: VoiceStats,
    /// Replies per category, text and voice combined.
    pub categories: BTreeMap<ResponseCategory, u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TurnStats {
    pub submitted: u64,
    pub composed: u64,
    pub cancelled: u64,
    pub rejected: u64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VoiceStats {
    pub listens: u64,
    pub replies: u64,
    pub utterances_spoken: u64,
    pub recognition_faults: u64,
    pub synthesis_faults: u64,
    pub unsupported_reports: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();
    let mut total_latency = 0u64;

    for event in events {
        match event {
            TelemetryEvent::TurnSubmitted { .. } => snap.turn_stats.submitted += 1,
            TelemetryEvent::InputRejected => snap.turn_stats.rejected += 1,
            TelemetryEvent::ReplyComposed { category, latency_ms, .. } => {
                snap.turn_stats.composed += 1;
                total_latency += latency_ms;
                snap.turn_stats.max_latency_ms = snap.turn_stats.max_latency_ms.max(*latency_ms);
                *snap.categories.entry(*category).or_default() += 1;
            }
            TelemetryEvent::CompositionCancelled { .. } => snap.turn_stats.cancelled += 1,
            TelemetryEvent::VoiceTransition { to, .. } => match to {
                VoiceState::Listening => snap.voice_stats.listens += 1,
                VoiceState::Speaking => snap.voice_stats.utterances_spoken += 1,
                _ => {}
            },
            TelemetryEvent::VoiceReply { category } => {
                snap.voice_stats.replies += 1;
                *snap.categories.entry(*category).or_default() += 1;
            }
            TelemetryEvent::VoiceFault { kind } => match kind {
                VoiceFault::Recognition => snap.voice_stats.recognition_faults += 1,
                VoiceFault::Synthesis => snap.voice_stats.synthesis_faults += 1,
                VoiceFault::Unsupported => snap.voice_stats.unsupported_reports += 1,
                VoiceFault::Busy | VoiceFault::Platform => {}
            },
        }
    }

    if snap.turn_stats.composed > 0 {
        snap.turn_stats.avg_latency_ms = total_latency as f64 / snap.turn_stats.composed as f64;
    }

    snap
}
