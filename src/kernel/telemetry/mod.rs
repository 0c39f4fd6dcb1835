//! Session telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! It must **NEVER** be read inside decision logic (engine, selector, voice transitions).
//!
//! # PRIVACY INVARIANT
//! Telemetry events must **NEVER** contain user content (utterance text, recognized speech).
//! Only ids, categories, states, durations and counts are allowed.

pub mod event;
pub mod metrics;
pub mod recorder;

pub use event::TelemetryEvent;
pub use metrics::TelemetrySnapshot;
pub use recorder::TelemetryRecorder;
