//! Capture session module
//!
//! This module implements the capture/record session core:
//! - CameraSession, the orchestrator enforcing the legal lifecycle order
//! - device acquisition and session negotiation (async over platform callbacks)
//! - capture options parsing
//! - the frame pump feeding the persistent callback handle

pub(crate) mod acquire;
pub mod options;
pub(crate) mod pump;
pub mod state;

pub use options::CaptureOptions;
pub use state::SessionState;

pub(crate) use acquire::resolve_camera;

use crate::bridge::CallbackHandle;
use crate::error::{CaptureError, CaptureResult};
use crate::platform::{
    CameraDescriptor, CameraDevice, CameraPlatform, CaptureRequest, CaptureSession, ImageFormat,
    OutputTarget, RequestTemplate, TargetPurpose, TargetSpec,
};
use crate::recorder::RecorderController;
use parking_lot::RwLock;
use pump::FramePump;
use state::SessionEvent;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Preview image target buffer queue depth
const PREVIEW_QUEUE_DEPTH: u32 = 10;

/// Native handles owned by an active session
///
/// Guarded by the hardware mutex: no two hardware-mutating operations on
/// the same session ever run concurrently.
#[derive(Default)]
struct Hardware {
    device: Option<Box<dyn CameraDevice>>,
    capture: Option<Box<dyn CaptureSession>>,
    recorder: Option<RecorderController>,
    preview_target: Option<OutputTarget>,
    pump: Option<FramePump>,
}

/// One capture, from acquisition to teardown
///
/// Sessions are one-shot: once stopped they are never restarted; callers
/// construct a fresh session per capture.
pub struct CameraSession {
    platform: Arc<dyn CameraPlatform>,
    camera: CameraDescriptor,
    options: CaptureOptions,
    media_dir: PathBuf,
    state: RwLock<SessionState>,
    hardware: AsyncMutex<Hardware>,
}

impl CameraSession {
    pub fn new(
        platform: Arc<dyn CameraPlatform>,
        camera: CameraDescriptor,
        options: CaptureOptions,
        media_dir: PathBuf,
    ) -> Self {
        Self {
            platform,
            camera,
            options,
            media_dir,
            state: RwLock::new(SessionState::Idle),
            hardware: AsyncMutex::new(Hardware::default()),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// The camera this session holds (or will hold)
    pub fn camera(&self) -> &CameraDescriptor {
        &self.camera
    }

    /// The immutable configuration snapshot
    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    fn transition(&self, event: SessionEvent) -> CaptureResult<SessionState> {
        let mut state = self.state.write();
        let next = state.next(event)?;
        tracing::debug!(
            "session on camera {}: {:?} -> {:?} ({event})",
            self.camera.id,
            *state,
            next
        );
        *state = next;
        Ok(next)
    }

    fn preview_request(&self, preview: &OutputTarget) -> CaptureRequest {
        CaptureRequest {
            template: RequestTemplate::Preview,
            targets: vec![preview.id],
            fps_range: None,
            flash: self.options.flash_mode,
        }
    }

    fn record_request(&self, preview: &OutputTarget, record: &OutputTarget) -> CaptureRequest {
        CaptureRequest {
            template: RequestTemplate::Record,
            targets: vec![preview.id, record.id],
            fps_range: Some((self.options.fps, self.options.fps)),
            flash: self.options.flash_mode,
        }
    }

    /// Acquire the device, negotiate the capture session, and start the
    /// repeating preview request. Frames flow to `handle` until `stop`.
    ///
    /// On failure the session lands in `Failed` with everything it managed
    /// to acquire released; a failed attempt never blocks a later one.
    pub async fn start_capture(&self, handle: Arc<dyn CallbackHandle>) -> CaptureResult<()> {
        let mut hw = self.hardware.lock().await;

        self.transition(SessionEvent::Start)?;

        let mut device = match acquire::open_device(&*self.platform, &self.camera.id).await {
            Ok(device) => device,
            Err(err) => {
                self.transition(SessionEvent::DeviceLost).ok();
                return Err(err);
            }
        };
        self.transition(SessionEvent::DeviceOpened)?;

        let preview_spec = TargetSpec {
            purpose: TargetPurpose::Preview,
            width: self.options.canvas_width,
            height: self.options.canvas_height,
            format: ImageFormat::Jpeg,
            max_images: PREVIEW_QUEUE_DEPTH,
        };
        let preview_target = match self.platform.allocate_target(&preview_spec) {
            Ok(target) => target,
            Err(err) => {
                tracing::error!("preview target allocation failed: {err}");
                self.transition(SessionEvent::ConfigurationFailed).ok();
                release_device(device.as_mut());
                return Err(CaptureError::ConfigurationFailed);
            }
        };

        let recorder = match RecorderController::new(
            &*self.platform,
            &self.options,
            self.media_dir.clone(),
        ) {
            Ok(recorder) => recorder,
            Err(err) => {
                self.transition(SessionEvent::ConfigurationFailed).ok();
                release_device(device.as_mut());
                return Err(err);
            }
        };

        // The recorder's persistent input target joins negotiation so the
        // record request can be issued later without renegotiating.
        let targets = vec![preview_target.clone(), recorder.input_target()];
        let mut capture = match acquire::create_session(device.as_mut(), targets).await {
            Ok(capture) => capture,
            Err(err) => {
                self.transition(SessionEvent::ConfigurationFailed).ok();
                release_device(device.as_mut());
                return Err(err);
            }
        };

        let pump = FramePump::spawn(handle, self.options.camera_facing);
        if let Err(err) = capture.set_repeating(self.preview_request(&preview_target), pump.sink())
        {
            tracing::error!("preview request failed: {err}");
            self.transition(SessionEvent::ConfigurationFailed).ok();
            pump.shutdown();
            release_device(device.as_mut());
            return Err(CaptureError::DeviceError(err.to_string()));
        }

        *hw = Hardware {
            device: Some(device),
            capture: Some(capture),
            recorder: Some(recorder),
            preview_target: Some(preview_target),
            pump: Some(pump),
        };
        self.transition(SessionEvent::SessionConfigured)?;

        tracing::info!(
            "previewing camera {} at {}x{}",
            self.camera.id,
            self.options.canvas_width,
            self.options.canvas_height
        );
        Ok(())
    }

    /// Start recording on top of the running preview.
    ///
    /// Requires `Previewing`; fails with `InvalidState` and no side effect
    /// otherwise. On encoder failure the preview request is restored
    /// best-effort and the session stays `Previewing`.
    pub async fn start_record(&self) -> CaptureResult<()> {
        let mut hw = self.hardware.lock().await;

        // Validate without committing; the transition lands after the
        // encoder is actually running.
        self.state().next(SessionEvent::StartRecord)?;

        let Hardware {
            capture,
            recorder,
            preview_target,
            pump,
            ..
        } = &mut *hw;
        let (capture, recorder, preview_target, pump) = match (
            capture.as_mut(),
            recorder.as_mut(),
            preview_target.as_ref(),
            pump.as_ref(),
        ) {
            (Some(c), Some(r), Some(t), Some(p)) => (c, r, t, p),
            _ => {
                return Err(CaptureError::InvalidState(
                    "capture session is not running".to_string(),
                ))
            }
        };

        let request = self.record_request(preview_target, &recorder.input_target());
        capture
            .set_repeating(request, pump.sink())
            .map_err(|err| CaptureError::DeviceError(err.to_string()))?;

        if let Err(err) = recorder.start().await {
            // Roll the repeating request back so the preview keeps running
            if let Err(rollback) =
                capture.set_repeating(self.preview_request(preview_target), pump.sink())
            {
                tracing::warn!("preview rollback failed: {rollback}");
            }
            return Err(err);
        }

        self.transition(SessionEvent::StartRecord)?;
        Ok(())
    }

    /// Tear the session down, releasing every native handle.
    ///
    /// Finalizes the encoder (when recording) before releasing the device
    /// and returns the recorded artifact path, or `None` when nothing was
    /// recorded. Idempotent: a second stop is a no-op.
    pub async fn stop(&self) -> CaptureResult<Option<PathBuf>> {
        let mut hw = self.hardware.lock().await;

        if self.state() == SessionState::Stopped {
            tracing::debug!("stop: session already stopped");
            return Ok(None);
        }

        tracing::info!("stopping session on camera {}", self.camera.id);

        let Hardware {
            device,
            capture,
            recorder,
            pump,
            ..
        } = &mut *hw;

        // Encoder finalization comes first so the artifact is complete
        // before its input surface goes away.
        let mut encoder_failure = None;
        let mut artifact = None;
        if let Some(recorder) = recorder.as_mut() {
            match recorder.stop().await {
                Ok(path) => artifact = path,
                Err(err) => {
                    tracing::error!("encoder finalization failed: {err}");
                    encoder_failure = Some(err);
                }
            }
        }
        *recorder = None;

        if let Some(capture) = capture.as_mut() {
            if let Err(err) = capture.stop_repeating() {
                tracing::warn!("stop repeating failed: {err}");
            }
        }
        *capture = None;

        if let Some(pump) = pump.take() {
            pump.shutdown();
        }

        if let Some(mut device) = device.take() {
            release_device(device.as_mut());
        }

        self.transition(SessionEvent::Stop)?;

        match encoder_failure {
            Some(err) => Err(err),
            None => Ok(artifact),
        }
    }

    /// Best-effort teardown for host destruction. Attempts device release
    /// in any state and suppresses every error.
    pub async fn destroy(&self) {
        let mut hw = self.hardware.lock().await;

        let Hardware {
            device,
            capture,
            recorder,
            pump,
            ..
        } = &mut *hw;

        if let Some(mut recorder) = recorder.take() {
            if let Err(err) = recorder.stop().await {
                tracing::warn!("encoder teardown failed: {err}");
            }
        }
        if let Some(capture) = capture.as_mut() {
            if let Err(err) = capture.stop_repeating() {
                tracing::warn!("stop repeating failed: {err}");
            }
        }
        *capture = None;
        if let Some(pump) = pump.take() {
            pump.shutdown();
        }
        if let Some(mut device) = device.take() {
            release_device(device.as_mut());
        }

        let mut state = self.state.write();
        if !state.is_terminal() {
            *state = SessionState::Stopped;
        }
    }
}

fn release_device(device: &mut dyn CameraDevice) {
    if let Err(err) = device.close() {
        tracing::warn!("camera {} release failed: {err}", device.id());
    }
}
