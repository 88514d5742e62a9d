//! Platform trait definitions
//!
//! Callback-style contracts shaped like the platform camera stack. Device
//! open and session configuration report their outcome through a one-shot
//! callback (exactly one terminal outcome per call); frames are pushed
//! through a sink for the lifetime of a repeating request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

/// Opaque platform-level failure, reported by a concrete backend
#[derive(Error, Debug)]
#[error("{0}")]
pub struct PlatformError(pub String);

/// Logical lens facing selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Front,
    Back,
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facing::Front => write!(f, "front"),
            Facing::Back => write!(f, "back"),
        }
    }
}

/// Information about an enumerated camera
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDescriptor {
    /// Unique device ID
    pub id: String,

    /// Device name
    pub name: String,

    /// Lens facing
    pub facing: Facing,
}

/// Pixel format of an image output target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Hardware-encoded JPEG frames
    Jpeg,
}

/// What a target feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPurpose {
    /// Preview frame sink (image reader)
    Preview,
    /// Encoder input surface
    Record,
}

/// Requested shape of an image output target
#[derive(Debug, Clone)]
pub struct TargetSpec {
    pub purpose: TargetPurpose,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// Buffer queue depth
    pub max_images: u32,
}

/// Opaque descriptor of an allocated output sink
///
/// The backend keeps the actual surface/buffer queue; the session only ever
/// references it by id. The set of targets bound to a capture session is
/// fixed at negotiation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputTarget {
    pub id: Uuid,
    pub purpose: TargetPurpose,
    pub width: u32,
    pub height: u32,
}

/// A transient borrowed view of one captured frame
///
/// Valid only for the duration of the sink callback; the receiver must copy
/// whatever it keeps before returning.
#[derive(Debug)]
pub struct Frame<'a> {
    /// Encoded JPEG bytes
    pub data: &'a [u8],

    /// Optional capture metadata supplied by the backend (EXIF-shaped)
    pub metadata: Option<&'a serde_json::Map<String, serde_json::Value>>,
}

/// Receiver for frames produced by a repeating capture request
///
/// Both callbacks run on the backend's delivery context. `on_frame` is
/// invoked exactly once per produced frame, before the underlying buffer is
/// reclaimed.
pub trait FrameSink: Send + Sync {
    fn on_frame(&self, frame: Frame<'_>);

    /// A single capture failed at the platform level. Dropped frames are
    /// not session-ending.
    fn on_capture_failed(&self, reason: &str);
}

/// Terminal outcome of a device open attempt
pub enum DeviceOutcome {
    Opened(Box<dyn CameraDevice>),
    Disconnected,
    Error(String),
}

/// One-shot resolution callback for [`CameraPlatform::open_device`]
pub type DeviceCallback = Box<dyn FnOnce(DeviceOutcome) + Send + 'static>;

/// Terminal outcome of a capture session negotiation
pub enum SessionOutcome {
    Configured(Box<dyn CaptureSession>),
    ConfigureFailed,
}

/// One-shot resolution callback for [`CameraDevice::create_capture_session`]
pub type SessionCallback = Box<dyn FnOnce(SessionOutcome) + Send + 'static>;

/// Capture request template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTemplate {
    Preview,
    Record,
}

/// Flash mode resolved from the options payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    Off,
    Torch,
}

/// A platform-neutral capture request
///
/// Holds references (by id) to the targets it renders into.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub template: RequestTemplate,
    pub targets: Vec<Uuid>,
    /// Requested AE fps range, `(min, max)`
    pub fps_range: Option<(u32, u32)>,
    pub flash: FlashMode,
}

/// Encoder configuration consumed when constructing a recorder
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_bitrate: u32,
}

/// Entry point into the host camera stack
pub trait CameraPlatform: Send + Sync {
    /// Enumerate the physical cameras
    fn cameras(&self) -> Vec<CameraDescriptor>;

    /// Open a camera device. Exclusively reserves the physical device until
    /// the returned handle is closed. `on_result` is invoked exactly once.
    fn open_device(&self, camera_id: &str, on_result: DeviceCallback);

    /// Allocate an image output target (preview sink)
    fn allocate_target(&self, spec: &TargetSpec) -> Result<OutputTarget, PlatformError>;

    /// Construct an unprepared recorder. Its input target is available
    /// immediately so it can join session negotiation before `prepare`.
    fn new_recorder(&self, settings: &EncoderSettings)
        -> Result<Box<dyn VideoRecorder>, PlatformError>;
}

/// An exclusively held camera device
pub trait CameraDevice: Send {
    fn id(&self) -> &str;

    /// Negotiate a capture session bound to `targets`. `on_result` is
    /// invoked exactly once with configured or configuration-failed.
    fn create_capture_session(&mut self, targets: Vec<OutputTarget>, on_result: SessionCallback);

    /// Release the device
    fn close(&mut self) -> Result<(), PlatformError>;
}

/// A configured capture session
pub trait CaptureSession: Send {
    /// Issue a persistent capture request, replacing any previous one.
    /// Every frame produced for the preview target is routed to `frames`
    /// until the request is stopped or replaced.
    fn set_repeating(
        &mut self,
        request: CaptureRequest,
        frames: std::sync::Arc<dyn FrameSink>,
    ) -> Result<(), PlatformError>;

    /// Stop the repeating request
    fn stop_repeating(&mut self) -> Result<(), PlatformError>;
}

/// Platform video encoder (MediaRecorder-shaped)
#[async_trait]
pub trait VideoRecorder: Send {
    /// The persistent input surface the capture session renders into
    fn input_target(&self) -> OutputTarget;

    /// Bind the output artifact and allocate encoder resources
    async fn prepare(&mut self, output: &Path) -> Result<(), PlatformError>;

    async fn start(&mut self) -> Result<(), PlatformError>;

    /// Finalize the artifact
    async fn stop(&mut self) -> Result<(), PlatformError>;

    /// Release encoder resources without finalizing
    fn release(&mut self);
}
