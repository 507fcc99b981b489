// Runtime camera/microphone permission checking
// Preview start is gated on both grants; the host platform supplies the actual
// check/request through a `PermissionProvider`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

/// Hardware resource that needs an explicit grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PermissionKind {
    Camera,
    Microphone,
}

/// Permission status for a capture resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PermissionStatus {
    /// Permission has been granted
    Granted,
    /// Permission has been explicitly denied
    Denied,
    /// Permission status is unknown or not determined yet
    NotDetermined,
    /// Unable to check permission status
    Unknown,
}

/// Platform hook for checking and requesting grants
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn check(&self, kind: PermissionKind) -> PermissionStatus;
    async fn request(&self, kind: PermissionKind) -> PermissionStatus;
}

/// Provider for platforms without runtime grants
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysGranted;

#[async_trait]
impl PermissionProvider for AlwaysGranted {
    async fn check(&self, _kind: PermissionKind) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn request(&self, _kind: PermissionKind) -> PermissionStatus {
        PermissionStatus::Granted
    }
}

/// Verifies camera and microphone access before any hardware activity
#[derive(Clone)]
pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn PermissionProvider>) -> Self {
        Self { provider }
    }

    pub fn always_granted() -> Self {
        Self::new(Arc::new(AlwaysGranted))
    }

    /// Returns `true` only when both camera and microphone are granted.
    ///
    /// Anything not yet granted is requested once.
    pub async fn ensure_permissions(&self) -> bool {
        let camera = self.ensure(PermissionKind::Camera).await;
        let microphone = self.ensure(PermissionKind::Microphone).await;

        let granted = camera == PermissionStatus::Granted && microphone == PermissionStatus::Granted;
        if granted {
            info!("✅ Camera and microphone access granted");
        } else {
            warn!(
                "🚫 Capture permissions missing (camera: {:?}, microphone: {:?})",
                camera, microphone
            );
        }
        granted
    }

    async fn ensure(&self, kind: PermissionKind) -> PermissionStatus {
        match self.provider.check(kind).await {
            PermissionStatus::Granted => PermissionStatus::Granted,
            status => {
                info!("🔐 Requesting {:?} access (currently {:?})", kind, status);
                self.provider.request(kind).await
            }
        }
    }
}

/// Get user-friendly instructions for enabling permissions
pub fn permission_instructions() -> String {
    "To go live, allow camera and microphone access:\n\
    1. Open the system Settings app\n\
    2. Find this app under Privacy (Camera and Microphone)\n\
    3. Enable both toggles\n\
    4. Return here; the preview restarts automatically"
        .to_string()
}
