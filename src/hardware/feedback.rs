use std::sync::Mutex;

use serde::Serialize;
use tracing::info;

/// Short audible cue reflecting a hardware state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeedbackCue {
    TorchOn,
    TorchOff,
    MicMuted,
    MicLive,
}

impl FeedbackCue {
    pub fn torch(on: bool) -> Self {
        if on {
            FeedbackCue::TorchOn
        } else {
            FeedbackCue::TorchOff
        }
    }

    pub fn mic(muted: bool) -> Self {
        if muted {
            FeedbackCue::MicMuted
        } else {
            FeedbackCue::MicLive
        }
    }
}

/// Plays feedback cues. Must not block.
pub trait FeedbackSink: Send + Sync {
    fn play(&self, cue: FeedbackCue);
}

/// Sink that only logs the cue, for hosts without sound effects
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

impl FeedbackSink for LogFeedback {
    fn play(&self, cue: FeedbackCue) {
        info!("🔔 Feedback cue: {:?}", cue);
    }
}

/// Sink that keeps every cue it was asked to play
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    cues: Mutex<Vec<FeedbackCue>>,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> Vec<FeedbackCue> {
        self.cues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl FeedbackSink for RecordingFeedback {
    fn play(&self, cue: FeedbackCue) {
        self.cues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(cue);
    }
}
