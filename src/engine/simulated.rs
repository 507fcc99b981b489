use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::NativeEngine;

/// Native operation, without its arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EngineOp {
    StartPreview,
    StopPreview,
    Start,
    Stop,
    SwitchCamera,
    SetZoom,
    ToggleTorch,
    ToggleMic,
    EnableAutoRotate,
}

/// One recorded native call, with its arguments
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EngineCall {
    StartPreview,
    StopPreview,
    Start {
        url: String,
        bitrate_bps: u32,
        width: u32,
        height: u32,
        fps: u32,
    },
    Stop,
    SwitchCamera,
    SetZoom(f64),
    ToggleTorch(bool),
    ToggleMic(bool),
    EnableAutoRotate(bool),
}

impl EngineCall {
    pub fn op(&self) -> EngineOp {
        match self {
            EngineCall::StartPreview => EngineOp::StartPreview,
            EngineCall::StopPreview => EngineOp::StopPreview,
            EngineCall::Start { .. } => EngineOp::Start,
            EngineCall::Stop => EngineOp::Stop,
            EngineCall::SwitchCamera => EngineOp::SwitchCamera,
            EngineCall::SetZoom(_) => EngineOp::SetZoom,
            EngineCall::ToggleTorch(_) => EngineOp::ToggleTorch,
            EngineCall::ToggleMic(_) => EngineOp::ToggleMic,
            EngineCall::EnableAutoRotate(_) => EngineOp::EnableAutoRotate,
        }
    }
}

#[derive(Debug, Default)]
struct SimulatorState {
    calls: Vec<EngineCall>,
    /// Remaining failures per operation; `u32::MAX` means fail forever
    failures: HashMap<EngineOp, u32>,
    delays: HashMap<EngineOp, Duration>,
}

/// In-process engine that records every call.
///
/// Used for headless runs and by the test-suite to assert call order. Any
/// operation can be made to fail or to take time.
#[derive(Debug, Default)]
pub struct SimulatedEngine {
    state: Mutex<SimulatorState>,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut SimulatorState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }

    /// Make the next `times` calls of `op` fail
    pub fn fail_next(&self, op: EngineOp, times: u32) {
        self.with_state(|s| {
            s.failures.insert(op, times);
        });
    }

    /// Make every call of `op` fail until cleared
    pub fn fail_always(&self, op: EngineOp) {
        self.fail_next(op, u32::MAX);
    }

    pub fn clear_failures(&self) {
        self.with_state(|s| s.failures.clear());
    }

    /// Delay completion of `op` by `delay`
    pub fn set_delay(&self, op: EngineOp, delay: Duration) {
        self.with_state(|s| {
            s.delays.insert(op, delay);
        });
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn calls_of(&self, op: EngineOp) -> Vec<EngineCall> {
        self.with_state(|s| s.calls.iter().filter(|c| c.op() == op).cloned().collect())
    }

    pub fn count(&self, op: EngineOp) -> usize {
        self.with_state(|s| s.calls.iter().filter(|c| c.op() == op).count())
    }

    pub fn clear_calls(&self) {
        self.with_state(|s| s.calls.clear());
    }

    async fn record(&self, call: EngineCall) -> Result<()> {
        let op = call.op();
        debug!("🧪 simulated engine: {:?}", call);

        let (delay, fail) = self.with_state(|s| {
            s.calls.push(call);
            let fail = match s.failures.get_mut(&op) {
                Some(remaining) if *remaining > 0 => {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    true
                }
                _ => false,
            };
            (s.delays.get(&op).copied(), fail)
        });

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if fail {
            Err(anyhow!("simulated {:?} failure", op))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NativeEngine for SimulatedEngine {
    async fn start_preview(&self) -> Result<()> {
        self.record(EngineCall::StartPreview).await
    }

    async fn stop_preview(&self) -> Result<()> {
        self.record(EngineCall::StopPreview).await
    }

    async fn start(
        &self,
        url: &str,
        bitrate_bps: u32,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<()> {
        self.record(EngineCall::Start {
            url: url.to_string(),
            bitrate_bps,
            width,
            height,
            fps,
        })
        .await
    }

    async fn stop(&self) -> Result<()> {
        self.record(EngineCall::Stop).await
    }

    async fn switch_camera(&self) -> Result<()> {
        self.record(EngineCall::SwitchCamera).await
    }

    async fn set_zoom(&self, factor: f64) -> Result<()> {
        self.record(EngineCall::SetZoom(factor)).await
    }

    async fn toggle_torch(&self, on: bool) -> Result<()> {
        self.record(EngineCall::ToggleTorch(on)).await
    }

    async fn toggle_mic(&self, on: bool) -> Result<()> {
        self.record(EngineCall::ToggleMic(on)).await
    }

    async fn enable_auto_rotate(&self, on: bool) -> Result<()> {
        self.record(EngineCall::EnableAutoRotate(on)).await
    }
}
