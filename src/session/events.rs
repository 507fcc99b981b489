use serde::Serialize;
use tokio::sync::broadcast;

use super::types::SessionMode;
use crate::error::BroadcastError;

/// Everything a UI observer needs to re-render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    ModeChanged { from: SessionMode, to: SessionMode },
    CountdownTick { remaining: u32 },
    ElapsedTick { seconds: u64 },
    StopProgress { progress: f64 },
    ZoomChanged { factor: f64 },
    Error { kind: String, message: String },
    Notice { message: String },
}

impl From<&BroadcastError> for SessionEvent {
    fn from(err: &BroadcastError) -> Self {
        SessionEvent::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

pub(crate) const EVENT_CAPACITY: usize = 256;

/// Publish without caring whether anyone listens
pub(crate) fn emit(events: &broadcast::Sender<SessionEvent>, event: SessionEvent) {
    let _ = events.send(event);
}
