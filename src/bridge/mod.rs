//! Command dispatch surface
//!
//! Maps the three webview-facing actions (`startCapture`, `startRecord`,
//! `stopCapture`) onto session lifecycle calls and translates outcomes
//! back into results on the caller's persistent handle. The host's own
//! dispatch envelope, permission prompts, and result transport all live
//! behind the traits in [`handle`].

pub mod handle;
pub mod registry;

pub use handle::{CallbackHandle, PermissionGate, PermissionRetry, PermissionState};
pub use registry::SessionRegistry;

use crate::error::CaptureError;
use crate::platform::CameraPlatform;
use crate::session::{resolve_camera, CameraSession, CaptureOptions, SessionState};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

struct Inner {
    platform: Arc<dyn CameraPlatform>,
    permissions: Arc<dyn PermissionGate>,
    /// Host-provided directory for recording artifacts
    media_dir: PathBuf,
    sessions: SessionRegistry,
}

/// Plugin entry point
///
/// One instance per host container; clones share state. Command work is
/// spawned onto the runtime, so dispatch itself never blocks. It must be
/// driven from within the host's Tokio runtime.
#[derive(Clone)]
pub struct CameraRecorder {
    inner: Arc<Inner>,
}

impl CameraRecorder {
    pub fn new(
        platform: Arc<dyn CameraPlatform>,
        permissions: Arc<dyn PermissionGate>,
        media_dir: PathBuf,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                platform,
                permissions,
                media_dir,
                sessions: SessionRegistry::new(),
            }),
        }
    }

    /// Dispatch one action invocation. Returns `false` for an action this
    /// plugin does not handle.
    pub fn execute(
        &self,
        client: &str,
        action: &str,
        args: &Value,
        handle: Arc<dyn CallbackHandle>,
    ) -> bool {
        tracing::info!("exec: {action} client: {client}");
        match action {
            "startCapture" => self.start_capture(client, args.clone(), handle),
            "startRecord" => self.start_record(client, handle),
            "stopCapture" => self.stop_capture(client, handle),
            _ => return false,
        }
        true
    }

    /// Observable state of the client's session, if any
    pub fn session_state(&self, client: &str) -> Option<SessionState> {
        self.inner.sessions.get(client).map(|session| session.state())
    }

    /// Begin a capture for `client`.
    ///
    /// Emits a pending acknowledgment once the attempt is actually
    /// underway; the terminal outcome (or the first frame) arrives later
    /// on the same handle. Missing permissions defer the command: the gate
    /// re-invokes it via the retry closure once the user grants access.
    pub fn start_capture(&self, client: &str, args: Value, handle: Arc<dyn CallbackHandle>) {
        if self.inner.sessions.get(client).is_some() {
            handle.error(CaptureError::DuplicateSession.to_string());
            return;
        }

        match self.inner.permissions.state() {
            PermissionState::Granted => {}
            PermissionState::Undetermined => {
                tracing::info!("startCapture deferred pending permissions");
                handle.pending();
                let recorder = self.clone();
                let client = client.to_string();
                let retry_handle = handle.clone();
                self.inner.permissions.request(Box::new(move || {
                    recorder.start_capture(&client, args, retry_handle);
                }));
                return;
            }
            PermissionState::Denied => {
                handle.error(
                    CaptureError::PermissionDenied("camera access denied by host".to_string())
                        .to_string(),
                );
                return;
            }
        }

        let options = match CaptureOptions::parse(&args) {
            Ok(options) => options,
            Err(err) => {
                tracing::warn!("startCapture rejected: {err}");
                handle.error(err.to_string());
                return;
            }
        };

        let camera = match resolve_camera(&*self.inner.platform, options.camera_facing) {
            Ok(camera) => camera,
            Err(err) => {
                handle.error(err.to_string());
                return;
            }
        };

        let session = Arc::new(CameraSession::new(
            self.inner.platform.clone(),
            camera,
            options,
            self.inner.media_dir.clone(),
        ));
        if let Err(err) = self.inner.sessions.claim(client, session.clone()) {
            handle.error(err.to_string());
            return;
        }

        handle.pending();

        let recorder = self.clone();
        let client = client.to_string();
        tokio::spawn(async move {
            if let Err(err) = session.start_capture(handle.clone()).await {
                // Clear the reference first so the failed attempt never
                // blocks a subsequent startCapture.
                recorder.inner.sessions.release(&client);
                tracing::error!("startCapture failed: {err}");
                handle.error(format!("startCapture failed: {err}"));
            }
        });
    }

    /// Start recording on the client's running session
    pub fn start_record(&self, client: &str, handle: Arc<dyn CallbackHandle>) {
        let Some(session) = self.inner.sessions.get(client) else {
            handle.error(
                CaptureError::InvalidState("capture session not started".to_string()).to_string(),
            );
            return;
        };

        tokio::spawn(async move {
            match session.start_record().await {
                Ok(()) => handle.success(json!("OK")),
                Err(err) => {
                    tracing::error!("startRecord failed: {err}");
                    handle.error(format!("startRecord failed: {err}"));
                }
            }
        });
    }

    /// Tear down the client's session and answer with the artifact path.
    ///
    /// Idempotent: with no active session this is a no-op success carrying
    /// a null path. The registry entry is cleared immediately so a new
    /// `startCapture` can proceed while teardown completes.
    pub fn stop_capture(&self, client: &str, handle: Arc<dyn CallbackHandle>) {
        let Some(session) = self.inner.sessions.release(client) else {
            handle.success(json!({ "file": null }));
            return;
        };

        tokio::spawn(async move {
            match session.stop().await {
                Ok(artifact) => handle.success(json!({
                    "file": artifact.map(|path| path.display().to_string())
                })),
                Err(err) => {
                    tracing::error!("stop failed: {err}");
                    handle.error(format!("stop failed: {err}"));
                }
            }
        });
    }

    /// Host paused; nothing to do, the capture pipeline keeps its handles.
    pub fn on_stop(&self) {
        tracing::debug!("host stop");
    }

    /// Host resumed
    pub fn on_resume(&self) {
        tracing::debug!("host resume");
    }

    /// Host is going away: release every session, suppressing errors.
    pub fn on_destroy(&self) {
        for session in self.inner.sessions.drain() {
            tokio::spawn(async move {
                session.destroy().await;
            });
        }
    }
}
