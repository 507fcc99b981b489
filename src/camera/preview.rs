use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use super::zoom::ZoomController;
use crate::engine::{best_effort, guarded, SharedEngine};
use crate::error::BroadcastError;
use crate::permissions::PermissionGate;

/// Owns the camera/microphone preview. The only component allowed to start or
/// stop it.
///
/// `start`/`stop` are idempotent and serialised: the `started` flag is held
/// for the whole call, so no two start/stop sequences interleave.
#[derive(Clone)]
pub struct PreviewLifecycle {
    engine: SharedEngine,
    gate: PermissionGate,
    zoom: ZoomController,
    retry_delay: Duration,
    started: Arc<Mutex<bool>>,
    active: Arc<watch::Sender<bool>>,
}

impl PreviewLifecycle {
    pub fn new(
        engine: SharedEngine,
        gate: PermissionGate,
        zoom: ZoomController,
        retry_delay: Duration,
    ) -> Self {
        let (active, _) = watch::channel(false);
        Self {
            engine,
            gate,
            zoom,
            retry_delay,
            started: Arc::new(Mutex::new(false)),
            active: Arc::new(active),
        }
    }

    /// Receiver that tracks whether capture hardware is live
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.active.subscribe()
    }

    pub fn is_started(&self) -> bool {
        *self.active.borrow()
    }

    pub async fn start(&self) -> Result<(), BroadcastError> {
        let mut started = self.started.lock().await;
        if *started {
            return Ok(());
        }

        if !self.gate.ensure_permissions().await {
            return Err(BroadcastError::PermissionDenied);
        }

        if let Err(first) = self.try_start().await {
            warn!("⚠️ Preview start failed, retrying next frame: {:#}", first);
            tokio::time::sleep(self.retry_delay).await;

            if let Err(second) = self.try_start().await {
                error!("❌ Preview start failed twice: {:#}", second);
                return Err(BroadcastError::PreviewUnavailable(format!("{:#}", second)));
            }
        }

        *started = true;
        self.active.send_replace(true);
        self.zoom.reset().await;
        info!("📷 Preview started");
        Ok(())
    }

    async fn try_start(&self) -> anyhow::Result<()> {
        best_effort("enable_auto_rotate", self.engine.enable_auto_rotate(true)).await;
        guarded("start_preview", self.engine.start_preview()).await
    }

    /// Stop the preview. Failures are logged; the flag always clears.
    pub async fn stop(&self) {
        let mut started = self.started.lock().await;
        if !*started {
            return;
        }

        best_effort("enable_auto_rotate", self.engine.enable_auto_rotate(false)).await;
        best_effort("stop_preview", self.engine.stop_preview()).await;

        *started = false;
        self.active.send_replace(false);
        info!("📷 Preview stopped");
    }

    /// Screen is going away: auto-rotation off regardless, preview off if on.
    pub async fn teardown(&self) {
        let mut started = self.started.lock().await;

        best_effort("enable_auto_rotate", self.engine.enable_auto_rotate(false)).await;
        if *started {
            best_effort("stop_preview", self.engine.stop_preview()).await;
        }

        *started = false;
        self.active.send_replace(false);
        info!("📷 Preview torn down");
    }

    pub async fn restart(&self) -> Result<(), BroadcastError> {
        self.stop().await;
        self.start().await
    }
}
