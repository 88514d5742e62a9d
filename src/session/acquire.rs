//! Device acquisition and session negotiation
//!
//! Adapts the platform's callback-style open/configure calls into async
//! suspension points. Each adapter resolves exactly once: the one-shot
//! channel guarantees a single terminal outcome reaches the caller even if
//! a misbehaving backend drops its callback.

use crate::error::{CaptureError, CaptureResult};
use crate::platform::{
    CameraDescriptor, CameraDevice, CameraPlatform, CaptureSession, DeviceOutcome, Facing,
    OutputTarget, SessionOutcome,
};
use tokio::sync::oneshot;

/// Resolve the facing selector against the enumerated cameras.
///
/// First match wins; no match is `NoMatchingDevice`.
pub(crate) fn resolve_camera(
    platform: &dyn CameraPlatform,
    facing: Facing,
) -> CaptureResult<CameraDescriptor> {
    platform
        .cameras()
        .into_iter()
        .find(|camera| camera.facing == facing)
        .ok_or(CaptureError::NoMatchingDevice(facing))
}

/// Open `camera_id`, suspending until the platform reports an outcome.
pub(crate) async fn open_device(
    platform: &dyn CameraPlatform,
    camera_id: &str,
) -> CaptureResult<Box<dyn CameraDevice>> {
    let (tx, rx) = oneshot::channel();
    platform.open_device(
        camera_id,
        Box::new(move |outcome| {
            let _ = tx.send(outcome);
        }),
    );

    match rx.await {
        Ok(DeviceOutcome::Opened(device)) => {
            tracing::debug!("camera {} opened", device.id());
            Ok(device)
        }
        Ok(DeviceOutcome::Disconnected) => {
            tracing::warn!("camera {camera_id} disconnected during open");
            Err(CaptureError::DeviceDisconnected)
        }
        Ok(DeviceOutcome::Error(reason)) => {
            tracing::error!("camera {camera_id} open failed: {reason}");
            Err(CaptureError::DeviceError(reason))
        }
        Err(_) => Err(CaptureError::DeviceError(
            "platform dropped the open callback without resolving it".to_string(),
        )),
    }
}

/// Negotiate a capture session over `targets`, suspending until configured.
pub(crate) async fn create_session(
    device: &mut dyn CameraDevice,
    targets: Vec<OutputTarget>,
) -> CaptureResult<Box<dyn CaptureSession>> {
    debug_assert!(!targets.is_empty());

    let (tx, rx) = oneshot::channel();
    device.create_capture_session(
        targets,
        Box::new(move |outcome| {
            let _ = tx.send(outcome);
        }),
    );

    match rx.await {
        Ok(SessionOutcome::Configured(session)) => Ok(session),
        Ok(SessionOutcome::ConfigureFailed) => {
            tracing::error!("camera {} session configuration failed", device.id());
            Err(CaptureError::ConfigurationFailed)
        }
        Err(_) => Err(CaptureError::ConfigurationFailed),
    }
}
