// Camera preview ownership and zoom

pub mod preview;
pub mod zoom;

pub use preview::PreviewLifecycle;
pub use zoom::{step, ZoomController, ZoomState, DEFAULT_ZOOM};
