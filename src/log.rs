use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Global flag to control per-frame gesture logging
pub static GESTURE_DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Set gesture debug logging on/off
pub fn set_gesture_debug(enabled: bool) {
    GESTURE_DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
    info!(
        "🔧 Gesture debug logging {}",
        if enabled { "ENABLED" } else { "DISABLED" }
    );
}

/// Check if gesture debug logging is enabled
pub fn is_gesture_debug_enabled() -> bool {
    GESTURE_DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Gesture debug macro - only logs if gesture debug is enabled
#[macro_export]
macro_rules! gesture_debug {
    ($($arg:tt)*) => {
        if $crate::log::GESTURE_DEBUG_ENABLED.load(std::sync::atomic::Ordering::Relaxed) {
            tracing::debug!($($arg)*);
        }
    };
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Calling this more than once is
/// harmless; later calls leave the first subscriber in place.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
