// Torch and microphone toggles
//
// Both follow the optimistic pattern in `optimistic`: local state flips first
// with an audible cue, the native call confirms, and a rejection rolls back.

pub mod feedback;
pub mod optimistic;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::engine::{guarded, SharedEngine};
pub use feedback::{FeedbackCue, FeedbackSink, LogFeedback, RecordingFeedback};
pub use optimistic::{optimistic_toggle, ToggleOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HardwareToggles {
    pub torch_on: bool,
    pub mic_muted: bool,
}

/// Sole writer of `HardwareToggles`
#[derive(Clone)]
pub struct HardwareToggleController {
    engine: SharedEngine,
    feedback: Arc<dyn FeedbackSink>,
    toggles: Arc<Mutex<HardwareToggles>>,
    preview_active: watch::Receiver<bool>,
}

impl HardwareToggleController {
    pub fn new(
        engine: SharedEngine,
        feedback: Arc<dyn FeedbackSink>,
        preview_active: watch::Receiver<bool>,
    ) -> Self {
        Self {
            engine,
            feedback,
            toggles: Arc::new(Mutex::new(HardwareToggles::default())),
            preview_active,
        }
    }

    pub async fn toggles(&self) -> HardwareToggles {
        *self.toggles.lock().await
    }

    fn hardware_active(&self) -> bool {
        *self.preview_active.borrow()
    }

    pub async fn toggle_torch(&self) -> ToggleOutcome {
        if !self.hardware_active() {
            debug!("🔦 Torch toggle ignored: preview inactive");
            return ToggleOutcome::Skipped;
        }

        // Held across the native call so overlapping taps apply in order
        let mut toggles = self.toggles.lock().await;
        let engine = self.engine.clone();
        let feedback = self.feedback.clone();

        let outcome = optimistic_toggle(
            &mut toggles.torch_on,
            |on| feedback.play(FeedbackCue::torch(on)),
            |on| async move { guarded("toggle_torch", engine.toggle_torch(on)).await },
        )
        .await;

        info!("🔦 Torch toggle: {:?}", outcome);
        outcome
    }

    /// Flip mute. The native call takes "mic on", the inverse of `mic_muted`.
    pub async fn toggle_mic(&self) -> ToggleOutcome {
        if !self.hardware_active() {
            debug!("🎙️ Mic toggle ignored: preview inactive");
            return ToggleOutcome::Skipped;
        }

        let mut toggles = self.toggles.lock().await;
        let engine = self.engine.clone();
        let feedback = self.feedback.clone();

        let outcome = optimistic_toggle(
            &mut toggles.mic_muted,
            |muted| feedback.play(FeedbackCue::mic(muted)),
            |muted| async move { guarded("toggle_mic", engine.toggle_mic(!muted)).await },
        )
        .await;

        info!("🎙️ Mic toggle: {:?}", outcome);
        outcome
    }

    /// Back to torch off, mic live. Local only; the preview is already down.
    pub async fn reset(&self) {
        *self.toggles.lock().await = HardwareToggles::default();
    }
}
