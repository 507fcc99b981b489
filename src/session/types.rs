use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

/// Broadcast lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Idle,
    Countdown,
    Live,
    Stopping,
    Ended,
}

impl SessionMode {
    /// A stream is (or should be) on air
    pub fn is_on_air(self) -> bool {
        matches!(self, SessionMode::Live | SessionMode::Stopping)
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionMode::Idle => "idle",
            SessionMode::Countdown => "countdown",
            SessionMode::Live => "live",
            SessionMode::Stopping => "stopping",
            SessionMode::Ended => "ended",
        };
        f.write_str(label)
    }
}

/// The single broadcast attempt
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub mode: SessionMode,
    /// Frozen when the countdown starts
    pub stream_url: Option<String>,
    pub elapsed_seconds: u64,
    /// Wall-clock start of the current live period
    pub started_at: Option<DateTime<Utc>>,
    /// Monotonic twin of `started_at`, used to derive `elapsed_seconds`
    pub(crate) clock_anchor: Option<Instant>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            mode: SessionMode::Idle,
            stream_url: None,
            elapsed_seconds: 0,
            started_at: None,
            clock_anchor: None,
        }
    }
}

impl Session {
    pub(crate) fn elapsed_at(&self, now: Instant) -> u64 {
        self.clock_anchor
            .map(|anchor| now.saturating_duration_since(anchor).as_secs())
            .unwrap_or(self.elapsed_seconds)
    }
}

/// What the ended screen shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    /// Redacted destination
    pub destination: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
}

/// Point-in-time view for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub mode: SessionMode,
    pub destination: Option<String>,
    pub elapsed_seconds: u64,
    pub elapsed_label: String,
    pub countdown_remaining: Option<u32>,
    pub stop_progress: Option<f64>,
    pub preview_active: bool,
    pub torch_on: bool,
    pub mic_muted: bool,
    pub zoom_factor: f64,
    pub is_front_camera: bool,
    pub resumption_pending: bool,
    pub last_error: Option<String>,
    pub summary: Option<SessionSummary>,
}

/// `MM:SS` under an hour, `H:MM:SS` from then on
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
