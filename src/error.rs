//! Error types and handling
//!
//! Failure taxonomy for the capture/record core. Everything that crosses
//! the bridge boundary is flattened to a string on the error channel of
//! the callback handle.

use crate::platform::Facing;
use thiserror::Error;

/// Errors produced by the capture/record core
#[derive(Error, Debug)]
pub enum CaptureError {
    /// `startCapture` while a session is already active. No state change.
    #[error("capture session duplicated")]
    DuplicateSession,

    /// The host reported a standing permission denial.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Malformed options payload. No session is created.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The facing selector matched no enumerated camera.
    #[error("no camera matching facing '{0}'")]
    NoMatchingDevice(Facing),

    /// The platform reported the device disconnected during acquisition.
    #[error("camera disconnected")]
    DeviceDisconnected,

    /// The platform reported a device-level error.
    #[error("camera device error: {0}")]
    DeviceError(String),

    /// The platform rejected the requested output target combination.
    #[error("capture session configuration failed")]
    ConfigurationFailed,

    /// An operation was invoked out of lifecycle order. No side effect.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Encoder prepare/start/stop failed. Partial artifacts are discarded.
    #[error("encoder failure: {0}")]
    EncoderFailure(String),
}

/// Result type alias using CaptureError
pub type CaptureResult<T> = Result<T, CaptureError>;
