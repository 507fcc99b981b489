use crate::session::SessionMode;

/// Failures the controller surfaces to its caller.
///
/// Best-effort failures (stop, resume, hardware toggles) never show up here;
/// they are logged and absorbed where they happen.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BroadcastError {
    #[error("Camera and microphone access is required to go live")]
    PermissionDenied,

    #[error("Camera preview could not be started: {0}")]
    PreviewUnavailable(String),

    #[error("Enter a stream URL or a stream key before going live")]
    EmptyDestination,

    #[error("Stream failed to start: {0}")]
    StreamStart(String),

    #[error("Cannot {action} while {mode}")]
    InvalidTransition {
        mode: SessionMode,
        action: &'static str,
    },

    #[error("Exit actions are only available once the broadcast has ended")]
    NotEnded,

    #[error("Invalid broadcast configuration: {0}")]
    Config(String),
}

impl BroadcastError {
    /// Stable identifier used in serialised error events.
    pub fn kind(&self) -> &'static str {
        match self {
            BroadcastError::PermissionDenied => "permission_denied",
            BroadcastError::PreviewUnavailable(_) => "preview_unavailable",
            BroadcastError::EmptyDestination => "empty_destination",
            BroadcastError::StreamStart(_) => "stream_start",
            BroadcastError::InvalidTransition { .. } => "invalid_transition",
            BroadcastError::NotEnded => "not_ended",
            BroadcastError::Config(_) => "config",
        }
    }
}
