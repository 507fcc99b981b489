pub mod camera;
pub mod config;
pub mod engine;
pub mod error;
pub mod hardware;
pub mod log;
pub mod navigation;
pub mod permissions;
pub mod session;

// Re-export the controller surface for hosts and tests
pub use camera::{PreviewLifecycle, ZoomController, ZoomState};
pub use config::{BroadcastConfig, StreamProfile, ZoomLimits, DEFAULT_RTMPS_SERVER};
pub use engine::{EngineCall, EngineOp, NativeEngine, SharedEngine, SimulatedEngine};
pub use error::BroadcastError;
pub use hardware::{
    FeedbackCue, FeedbackSink, HardwareToggleController, HardwareToggles, LogFeedback,
    RecordingFeedback, ToggleOutcome,
};
pub use log::{init_logging, set_gesture_debug};
pub use navigation::{ExitAction, NavigationTargets};
pub use permissions::{
    AlwaysGranted, PermissionGate, PermissionKind, PermissionProvider, PermissionStatus,
};
pub use session::{
    format_elapsed, BroadcastSession, BroadcastSessionBuilder, DestinationInput,
    DestinationMode, LifecycleEvent, SessionEvent, SessionMode, SessionSnapshot,
    SessionSummary,
};
