//! Scripted in-memory platform, callback handle, and permission gate for
//! exercising the session core end to end.

// Not every test binary uses every helper.
#![allow(dead_code)]

use camera_recorder::platform::{
    CameraDescriptor, CameraDevice, CameraPlatform, CaptureRequest, CaptureSession,
    DeviceCallback, DeviceOutcome, EncoderSettings, Facing, Frame, FrameSink, OutputTarget,
    PlatformError, SessionCallback, SessionOutcome, TargetPurpose, TargetSpec, VideoRecorder,
};
use camera_recorder::{
    CallbackHandle, CameraRecorder, PermissionGate, PermissionState, SessionState,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Scripted outcome for the next `open_device` call
#[derive(Clone)]
pub enum OpenScript {
    Opened,
    Disconnected,
    Error(String),
}

/// Scripted outcome for the next `create_capture_session` call
#[derive(Clone)]
pub enum ConfigureScript {
    Configured,
    Failed,
}

/// Shared observable state of the fake camera stack
#[derive(Default)]
pub struct PlatformState {
    sink: Mutex<Option<Arc<dyn FrameSink>>>,
    pub repeating: Mutex<Option<CaptureRequest>>,
    pub devices_opened: AtomicUsize,
    pub devices_closed: AtomicUsize,
    pub recorders_created: AtomicUsize,
}

impl PlatformState {
    /// Push one frame through the current repeating request's sink
    pub fn emit_frame(&self, jpeg: &[u8]) {
        let sink = self.sink.lock().clone();
        if let Some(sink) = sink {
            sink.on_frame(Frame {
                data: jpeg,
                metadata: None,
            });
        }
    }

    pub fn emit_capture_failure(&self, reason: &str) {
        let sink = self.sink.lock().clone();
        if let Some(sink) = sink {
            sink.on_capture_failed(reason);
        }
    }

    pub fn has_repeating(&self) -> bool {
        self.sink.lock().is_some()
    }
}

pub struct FakePlatform {
    cameras: Vec<CameraDescriptor>,
    open_script: Mutex<VecDeque<OpenScript>>,
    configure_script: Arc<Mutex<VecDeque<ConfigureScript>>>,
    pub state: Arc<PlatformState>,
}

impl FakePlatform {
    /// A stack with one back camera ("0") and one front camera ("1")
    pub fn new() -> Arc<Self> {
        Self::with_cameras(vec![
            CameraDescriptor {
                id: "0".to_string(),
                name: "Back Camera".to_string(),
                facing: Facing::Back,
            },
            CameraDescriptor {
                id: "1".to_string(),
                name: "Front Camera".to_string(),
                facing: Facing::Front,
            },
        ])
    }

    pub fn with_cameras(cameras: Vec<CameraDescriptor>) -> Arc<Self> {
        Arc::new(Self {
            cameras,
            open_script: Mutex::new(VecDeque::new()),
            configure_script: Arc::new(Mutex::new(VecDeque::new())),
            state: Arc::new(PlatformState::default()),
        })
    }

    /// Queue an outcome for the next device open (defaults to `Opened`)
    pub fn script_open(&self, outcome: OpenScript) {
        self.open_script.lock().push_back(outcome);
    }

    /// Queue an outcome for the next negotiation (defaults to `Configured`)
    pub fn script_configure(&self, outcome: ConfigureScript) {
        self.configure_script.lock().push_back(outcome);
    }
}

impl CameraPlatform for FakePlatform {
    fn cameras(&self) -> Vec<CameraDescriptor> {
        self.cameras.clone()
    }

    fn open_device(&self, camera_id: &str, on_result: DeviceCallback) {
        let script = self
            .open_script
            .lock()
            .pop_front()
            .unwrap_or(OpenScript::Opened);
        match script {
            OpenScript::Opened => {
                self.state.devices_opened.fetch_add(1, Ordering::SeqCst);
                on_result(DeviceOutcome::Opened(Box::new(FakeDevice {
                    id: camera_id.to_string(),
                    state: self.state.clone(),
                    configure_script: self.configure_script.clone(),
                })));
            }
            OpenScript::Disconnected => on_result(DeviceOutcome::Disconnected),
            OpenScript::Error(reason) => on_result(DeviceOutcome::Error(reason)),
        }
    }

    fn allocate_target(&self, spec: &TargetSpec) -> Result<OutputTarget, PlatformError> {
        Ok(OutputTarget {
            id: Uuid::new_v4(),
            purpose: spec.purpose,
            width: spec.width,
            height: spec.height,
        })
    }

    fn new_recorder(
        &self,
        settings: &EncoderSettings,
    ) -> Result<Box<dyn VideoRecorder>, PlatformError> {
        self.state.recorders_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeRecorder {
            target: OutputTarget {
                id: Uuid::new_v4(),
                purpose: TargetPurpose::Record,
                width: settings.width,
                height: settings.height,
            },
            output: None,
        }))
    }
}

struct FakeDevice {
    id: String,
    state: Arc<PlatformState>,
    configure_script: Arc<Mutex<VecDeque<ConfigureScript>>>,
}

impl CameraDevice for FakeDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn create_capture_session(&mut self, targets: Vec<OutputTarget>, on_result: SessionCallback) {
        assert!(!targets.is_empty(), "negotiation requires targets");
        let script = self
            .configure_script
            .lock()
            .pop_front()
            .unwrap_or(ConfigureScript::Configured);
        match script {
            ConfigureScript::Configured => {
                on_result(SessionOutcome::Configured(Box::new(FakeCaptureSession {
                    state: self.state.clone(),
                })));
            }
            ConfigureScript::Failed => on_result(SessionOutcome::ConfigureFailed),
        }
    }

    fn close(&mut self) -> Result<(), PlatformError> {
        self.state.devices_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeCaptureSession {
    state: Arc<PlatformState>,
}

impl CaptureSession for FakeCaptureSession {
    fn set_repeating(
        &mut self,
        request: CaptureRequest,
        frames: Arc<dyn FrameSink>,
    ) -> Result<(), PlatformError> {
        *self.state.repeating.lock() = Some(request);
        *self.state.sink.lock() = Some(frames);
        Ok(())
    }

    fn stop_repeating(&mut self) -> Result<(), PlatformError> {
        *self.state.repeating.lock() = None;
        *self.state.sink.lock() = None;
        Ok(())
    }
}

struct FakeRecorder {
    target: OutputTarget,
    output: Option<PathBuf>,
}

#[async_trait]
impl VideoRecorder for FakeRecorder {
    fn input_target(&self) -> OutputTarget {
        self.target.clone()
    }

    async fn prepare(&mut self, output: &Path) -> Result<(), PlatformError> {
        self.output = Some(output.to_path_buf());
        Ok(())
    }

    async fn start(&mut self) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), PlatformError> {
        // Finalizing writes the artifact
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| PlatformError("recorder was never prepared".to_string()))?;
        std::fs::write(output, b"mp4").map_err(|err| PlatformError(err.to_string()))
    }

    fn release(&mut self) {}
}

/// Everything emitted on a callback handle, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Emitted {
    Pending,
    Success(Value),
    Error(String),
    Frame(Value),
}

#[derive(Default)]
pub struct FakeHandle {
    events: Mutex<Vec<Emitted>>,
}

impl FakeHandle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Emitted> {
        self.events.lock().clone()
    }

    pub fn frames(&self) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Emitted::Frame(payload) => Some(payload),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Emitted::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn successes(&self) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Emitted::Success(payload) => Some(payload),
                _ => None,
            })
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Emitted::Pending))
            .count()
    }

    /// Poll until `predicate` holds over the emitted events
    pub async fn wait_until<F>(&self, predicate: F) -> bool
    where
        F: Fn(&[Emitted]) -> bool,
    {
        for _ in 0..400 {
            if predicate(&self.events()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    /// Wait for the first terminal result (success or error)
    pub async fn wait_terminal(&self) -> Option<Emitted> {
        self.wait_until(|events| {
            events
                .iter()
                .any(|event| matches!(event, Emitted::Success(_) | Emitted::Error(_)))
        })
        .await;
        self.events()
            .into_iter()
            .find(|event| matches!(event, Emitted::Success(_) | Emitted::Error(_)))
    }

    pub async fn wait_frames(&self, count: usize) -> bool {
        self.wait_until(|events| {
            events
                .iter()
                .filter(|event| matches!(event, Emitted::Frame(_)))
                .count()
                >= count
        })
        .await
    }
}

impl CallbackHandle for FakeHandle {
    fn pending(&self) {
        self.events.lock().push(Emitted::Pending);
    }

    fn success(&self, payload: Value) {
        self.events.lock().push(Emitted::Success(payload));
    }

    fn error(&self, message: String) {
        self.events.lock().push(Emitted::Error(message));
    }

    fn frame(&self, payload: Value) {
        self.events.lock().push(Emitted::Frame(payload));
    }
}

pub struct FakeGate {
    state: Mutex<PermissionState>,
    retry: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl FakeGate {
    pub fn granted() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PermissionState::Granted),
            retry: Mutex::new(None),
        })
    }

    pub fn undetermined() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PermissionState::Undetermined),
            retry: Mutex::new(None),
        })
    }

    pub fn denied() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PermissionState::Denied),
            retry: Mutex::new(None),
        })
    }

    pub fn has_pending_retry(&self) -> bool {
        self.retry.lock().is_some()
    }

    /// Grant the permissions and run the deferred command
    pub fn grant_and_retry(&self) {
        *self.state.lock() = PermissionState::Granted;
        let retry = self.retry.lock().take();
        if let Some(retry) = retry {
            retry();
        }
    }
}

impl PermissionGate for FakeGate {
    fn state(&self) -> PermissionState {
        *self.state.lock()
    }

    fn request(&self, retry: Box<dyn FnOnce() + Send>) {
        *self.retry.lock() = Some(retry);
    }
}

/// A plugin wired to a fresh fake stack and a temp media dir
pub fn plugin(
    platform: &Arc<FakePlatform>,
    gate: &Arc<FakeGate>,
) -> anyhow::Result<(CameraRecorder, tempfile::TempDir)> {
    let media_dir = tempfile::tempdir()?;
    let recorder = CameraRecorder::new(
        platform.clone(),
        gate.clone(),
        media_dir.path().to_path_buf(),
    );
    Ok((recorder, media_dir))
}

/// Poll until the client's session reaches `state`
pub async fn wait_for_state(
    recorder: &CameraRecorder,
    client: &str,
    state: SessionState,
) -> bool {
    for _ in 0..400 {
        if recorder.session_state(client) == Some(state) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}
