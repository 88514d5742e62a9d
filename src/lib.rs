//! Camera capture and recording session core for webview-hosted hybrid apps.
//!
//! This crate owns the session state machine coordinating camera device
//! acquisition, capture-session negotiation, preview streaming, and video
//! recording, plus the bridge that maps JSON command invocations onto it.
//! The host's camera stack, result transport, and permission prompts are
//! injected through the traits in [`platform`] and [`bridge`].

pub mod bridge;
pub mod error;
pub mod platform;
pub mod recorder;
pub mod session;

pub use bridge::{CallbackHandle, CameraRecorder, PermissionGate, PermissionState, SessionRegistry};
pub use error::{CaptureError, CaptureResult};
pub use session::{CameraSession, CaptureOptions, SessionState};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging. Hosts call this once at startup.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camera_recorder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("camera-recorder v{}", env!("CARGO_PKG_VERSION"));
}
