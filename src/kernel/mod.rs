//! The conversation core: classification, selection, transcript and turn state.

pub mod classifier;
pub mod engine;
pub mod event;
pub mod responses;
pub mod scheduler;
pub mod selector;
pub mod state;
pub mod telemetry;
