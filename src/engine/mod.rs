// Native streaming engine binding
//
// The camera/encoder/uploader lives on the host platform. The controller only
// sees this trait; the binding is injected once and shared by every component.

pub mod simulated;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::FutureExt;
use tracing::warn;

pub use simulated::{EngineCall, EngineOp, SimulatedEngine};

/// Opaque native streaming engine.
///
/// Every call is asynchronous and may be serviced on another thread. A
/// rejected call is reported as `Err`, never by panicking.
#[async_trait]
pub trait NativeEngine: Send + Sync {
    async fn start_preview(&self) -> Result<()>;
    async fn stop_preview(&self) -> Result<()>;
    async fn start(
        &self,
        url: &str,
        bitrate_bps: u32,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<()>;
    async fn stop(&self) -> Result<()>;
    async fn switch_camera(&self) -> Result<()>;
    async fn set_zoom(&self, factor: f64) -> Result<()>;
    async fn toggle_torch(&self, on: bool) -> Result<()>;
    async fn toggle_mic(&self, on: bool) -> Result<()>;
    async fn enable_auto_rotate(&self, on: bool) -> Result<()>;
}

pub type SharedEngine = Arc<dyn NativeEngine>;

/// Run a native call, turning a panic inside the binding into an error.
pub async fn guarded<F>(operation: &'static str, call: F) -> Result<()>
where
    F: Future<Output = Result<()>> + Send,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.context(format!("native {} failed", operation))),
        Err(_) => Err(anyhow!("native {} panicked", operation)),
    }
}

/// Run a native call whose failure must never block the caller.
///
/// Returns whether the call succeeded.
pub async fn best_effort<F>(operation: &'static str, call: F) -> bool
where
    F: Future<Output = Result<()>> + Send,
{
    match guarded(operation, call).await {
        Ok(()) => true,
        Err(e) => {
            warn!("⚠️ Ignoring {:#}", e);
            false
        }
    }
}
