// Broadcast session - lifecycle state machine and its timed sequences
//
// - manager: the orchestrator (idle -> countdown -> live -> stopping -> ended)
// - sequencer: pre-roll countdown and stop grace period
// - lifecycle: host focus/foreground events and the resume intent
// - destination: ingest URL resolution and redaction
// - events: observer stream for the UI

pub mod destination;
pub mod events;
pub mod lifecycle;
pub mod manager;
pub mod sequencer;
pub mod types;

pub use destination::{redact_destination, DestinationInput, DestinationMode};
pub use events::SessionEvent;
pub use lifecycle::{LifecycleEvent, ResumptionIntent};
pub use manager::{BroadcastSession, BroadcastSessionBuilder};
pub use sequencer::{Countdown, CountdownTick, StopSequence, StopTick};
pub use types::{format_elapsed, Session, SessionMode, SessionSnapshot, SessionSummary};
