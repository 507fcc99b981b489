use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::BroadcastError;

/// Built-in RTMPS ingest used when the user supplies only a stream key
pub const DEFAULT_RTMPS_SERVER: &str = "rtmps://live-api-s.facebook.com:443/rtmp/";

/// Encoder settings passed to the native `start()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamProfile {
    pub bitrate_bps: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for StreamProfile {
    fn default() -> Self {
        Self {
            bitrate_bps: 2_500_000,
            width: 1280,
            height: 720,
            fps: 30,
        }
    }
}

/// Zoom clamp bounds. Front cameras never go below `front_min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
    pub front_min: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: 0.5,
            max: 2.0,
            front_min: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Ingest base used in server+key mode when the server field is blank
    pub default_server: String,

    /// Encoder settings
    pub profile: StreamProfile,

    /// Pre-roll countdown
    pub countdown_from: u32,
    pub native_start_at: u32,

    /// Grace period before teardown
    pub stop_grace_ms: u64,
    pub stop_tick_ms: u64,

    /// Scheduler cadence
    pub frame_interval_ms: u64,
    pub clock_tick_ms: u64,

    pub zoom: ZoomLimits,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            default_server: DEFAULT_RTMPS_SERVER.to_string(),
            profile: StreamProfile::default(),
            countdown_from: 3,
            native_start_at: 2,
            stop_grace_ms: 5000,
            stop_tick_ms: 50,
            frame_interval_ms: 16,
            clock_tick_ms: 1000,
            zoom: ZoomLimits::default(),
        }
    }
}

impl BroadcastConfig {
    /// Defaults with `COURTSIDE_DEFAULT_SERVER` / `COURTSIDE_STREAM_BITRATE` applied
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(server) = std::env::var("COURTSIDE_DEFAULT_SERVER") {
            if !server.trim().is_empty() {
                config.default_server = server.trim().to_string();
            }
        }

        if let Ok(raw) = std::env::var("COURTSIDE_STREAM_BITRATE") {
            match raw.trim().parse::<u32>() {
                Ok(bitrate) if bitrate > 0 => config.profile.bitrate_bps = bitrate,
                _ => warn!("⚠️ Ignoring invalid COURTSIDE_STREAM_BITRATE value: {}", raw),
            }
        }

        config
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).context("Failed to parse broadcast config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file; missing fields fall back to defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read broadcast config {}", path.display()))?;
        let config = Self::from_json_str(&raw)?;
        info!("📄 Loaded broadcast config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BroadcastError> {
        if self.countdown_from == 0 {
            return Err(BroadcastError::Config("countdown_from must be at least 1".into()));
        }
        if self.native_start_at >= self.countdown_from {
            return Err(BroadcastError::Config(format!(
                "native_start_at ({}) must be below countdown_from ({})",
                self.native_start_at, self.countdown_from
            )));
        }
        if self.stop_grace_ms == 0 || self.stop_tick_ms == 0 {
            return Err(BroadcastError::Config("stop timings must be non-zero".into()));
        }
        if self.frame_interval_ms == 0 || self.clock_tick_ms == 0 {
            return Err(BroadcastError::Config("scheduler intervals must be non-zero".into()));
        }
        let zoom = &self.zoom;
        if !(zoom.min > 0.0 && zoom.min <= zoom.front_min && zoom.front_min <= zoom.max) {
            return Err(BroadcastError::Config(format!(
                "zoom limits out of order: min {} front_min {} max {}",
                zoom.min, zoom.front_min, zoom.max
            )));
        }
        Ok(())
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn stop_tick(&self) -> Duration {
        Duration::from_millis(self.stop_tick_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn clock_tick(&self) -> Duration {
        Duration::from_millis(self.clock_tick_ms)
    }
}
