use serde::{Deserialize, Serialize};

/// Host notifications the controller reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Screen mounted for the first time
    Mount,
    FocusGained,
    FocusLost,
    Foreground,
    Background,
    /// Screen torn down for good
    Unmount,
}

impl LifecycleEvent {
    /// Control came back to the screen
    pub fn regains_control(self) -> bool {
        matches!(
            self,
            LifecycleEvent::Mount | LifecycleEvent::FocusGained | LifecycleEvent::Foreground
        )
    }

    /// Control left the screen, but the screen still exists
    pub fn loses_control(self) -> bool {
        matches!(self, LifecycleEvent::FocusLost | LifecycleEvent::Background)
    }
}

/// Remembers an on-air session across background/focus loss.
///
/// Consumed at most once: `take` clears it whether or not the resume works.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResumptionIntent {
    pending: bool,
    stream_url: Option<String>,
}

impl ResumptionIntent {
    pub fn record(&mut self, stream_url: String) {
        self.pending = true;
        self.stream_url = Some(stream_url);
    }

    pub fn take(&mut self) -> Option<String> {
        let intent = std::mem::take(self);
        if intent.pending {
            intent.stream_url
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}
