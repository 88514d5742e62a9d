//! Platform collaborator abstractions
//!
//! The physical camera stack (device, capture session, encoder, output
//! surfaces) is owned by the host operating system. This module defines the
//! seam the session core drives it through.

pub mod traits;

// Re-export the platform surface
pub use traits::{
    CameraDescriptor, CameraDevice, CameraPlatform, CaptureRequest, CaptureSession, DeviceCallback,
    DeviceOutcome, EncoderSettings, Facing, FlashMode, Frame, FrameSink, ImageFormat, OutputTarget,
    PlatformError, RequestTemplate, SessionCallback, SessionOutcome, TargetPurpose, TargetSpec,
    VideoRecorder,
};
