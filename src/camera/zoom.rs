use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::ZoomLimits;
use crate::engine::{guarded, SharedEngine};
use crate::gesture_debug;

pub const DEFAULT_ZOOM: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoomState {
    /// Displayed factor, stepped to one decimal
    pub ui_zoom_factor: f64,
    /// Last factor the native layer accepted
    pub last_sent_factor: f64,
    /// `ui_zoom_factor` captured at gesture start
    pub pinch_base_factor: f64,
    pub is_front_camera: bool,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self {
            ui_zoom_factor: DEFAULT_ZOOM,
            last_sent_factor: DEFAULT_ZOOM,
            pinch_base_factor: DEFAULT_ZOOM,
            is_front_camera: false,
        }
    }
}

/// Round to one decimal place
pub fn step(factor: f64) -> f64 {
    (factor * 10.0).round() / 10.0
}

fn same_step(a: f64, b: f64) -> bool {
    (a * 10.0).round() as i64 == (b * 10.0).round() as i64
}

#[derive(Debug, Default)]
struct ZoomInner {
    state: ZoomState,
    /// Capacity-1 slot: newer input overwrites, the frame tick drains it
    pending: Option<f64>,
    frame_scheduled: bool,
}

struct ZoomShared {
    engine: SharedEngine,
    limits: ZoomLimits,
    frame_interval: Duration,
    inner: Mutex<ZoomInner>,
    /// Serialises native `set_zoom` calls so a flush lands after any in-flight frame dispatch
    dispatch_lock: tokio::sync::Mutex<()>,
}

/// Turns pinch gestures into clamped, frame-throttled native zoom calls
#[derive(Clone)]
pub struct ZoomController {
    shared: Arc<ZoomShared>,
}

impl ZoomController {
    pub fn new(engine: SharedEngine, limits: ZoomLimits, frame_interval: Duration) -> Self {
        Self {
            shared: Arc::new(ZoomShared {
                engine,
                limits,
                frame_interval,
                inner: Mutex::new(ZoomInner::default()),
                dispatch_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, ZoomInner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> ZoomState {
        self.inner().state
    }

    fn min_for(&self, is_front_camera: bool) -> f64 {
        if is_front_camera {
            self.shared.limits.front_min
        } else {
            self.shared.limits.min
        }
    }

    pub fn gesture_begin(&self) {
        let mut inner = self.inner();
        inner.state.pinch_base_factor = inner.state.ui_zoom_factor;
        gesture_debug!("🤏 Pinch began at {:.1}x", inner.state.pinch_base_factor);
    }

    /// Apply a gesture scale relative to the factor at gesture start.
    ///
    /// Returns the new displayed factor when it changed. The native dispatch
    /// happens on the next frame tick.
    pub fn gesture_update(&self, scale: f64) -> Option<f64> {
        if !scale.is_finite() {
            return None;
        }

        let mut inner = self.inner();
        let min = self.min_for(inner.state.is_front_camera);
        let max = self.shared.limits.max;

        let desired = (inner.state.pinch_base_factor * scale).clamp(min, max);
        let stepped = step(desired).clamp(min, max);
        if same_step(stepped, inner.state.ui_zoom_factor) {
            return None;
        }

        inner.state.ui_zoom_factor = stepped;
        inner.pending = Some(stepped);
        gesture_debug!("🤏 Pinch scale {:.3} -> {:.1}x", scale, stepped);

        if !inner.frame_scheduled {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                inner.frame_scheduled = true;
                let weak = Arc::downgrade(&self.shared);
                let frame = self.shared.frame_interval;
                handle.spawn(async move {
                    tokio::time::sleep(frame).await;
                    if let Some(shared) = Weak::upgrade(&weak) {
                        ZoomController { shared }.drain_frame().await;
                    }
                });
            }
        }

        Some(stepped)
    }

    /// Gesture ended or was cancelled: push the current factor now.
    pub async fn gesture_end(&self) {
        let _dispatch = self.shared.dispatch_lock.lock().await;
        let current = {
            let mut inner = self.inner();
            inner.pending = None;
            inner.state.ui_zoom_factor
        };
        self.send_if_changed(current).await;
    }

    /// One frame tick: send the latest pending value, if any.
    pub async fn drain_frame(&self) {
        let _dispatch = self.shared.dispatch_lock.lock().await;
        let target = {
            let mut inner = self.inner();
            inner.frame_scheduled = false;
            inner.pending.take()
        };
        if let Some(factor) = target {
            self.send_if_changed(factor).await;
        }
    }

    /// Caller holds `dispatch_lock`
    async fn send_if_changed(&self, factor: f64) {
        if same_step(factor, self.inner().state.last_sent_factor) {
            return;
        }
        self.send(factor).await;
    }

    /// Caller holds `dispatch_lock`
    async fn send(&self, factor: f64) -> bool {
        match guarded("set_zoom", self.shared.engine.set_zoom(factor)).await {
            Ok(()) => {
                self.inner().state.last_sent_factor = factor;
                gesture_debug!("🔍 Native zoom set to {:.1}x", factor);
                true
            }
            Err(e) => {
                warn!("⚠️ Zoom dispatch failed: {:#}", e);
                false
            }
        }
    }

    /// Back to 1.0x, pushed to the native layer even if it already matches.
    pub async fn reset(&self) {
        let _dispatch = self.shared.dispatch_lock.lock().await;
        {
            let mut inner = self.inner();
            inner.pending = None;
            inner.state.ui_zoom_factor = DEFAULT_ZOOM;
            inner.state.pinch_base_factor = DEFAULT_ZOOM;
        }
        self.send(DEFAULT_ZOOM).await;
    }

    /// Local-only reset for teardown, when the preview is already gone.
    pub fn reset_local(&self) {
        let mut inner = self.inner();
        let is_front_camera = inner.state.is_front_camera;
        inner.pending = None;
        inner.state = ZoomState {
            is_front_camera,
            ..ZoomState::default()
        };
    }

    /// Record the active camera facing and re-apply its clamp.
    ///
    /// Returns the corrected factor if the clamp changed it.
    pub async fn set_front_camera(&self, is_front_camera: bool) -> Option<f64> {
        let _dispatch = self.shared.dispatch_lock.lock().await;
        let corrected = {
            let mut inner = self.inner();
            inner.state.is_front_camera = is_front_camera;
            let min = self.min_for(is_front_camera);
            if inner.state.ui_zoom_factor < min {
                inner.state.ui_zoom_factor = min;
                inner.pending = None;
                Some(min)
            } else {
                None
            }
        };

        if let Some(factor) = corrected {
            info!("🔍 Zoom raised to {:.1}x for front camera", factor);
            self.send_if_changed(factor).await;
        }
        corrected
    }
}
