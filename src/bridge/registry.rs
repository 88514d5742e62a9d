//! Session registry
//!
//! Explicit registry keyed by the caller-supplied client handle, replacing
//! an ambient current-session singleton. The registry is also where the
//! one-session-per-physical-camera invariant is enforced: a claim is
//! atomic and rejects both a duplicate client and a second claim on a
//! camera some other client already holds.

use crate::error::{CaptureError, CaptureResult};
use crate::session::CameraSession;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

struct Entry {
    camera_id: String,
    session: Arc<CameraSession>,
}

/// Active sessions, keyed by client handle
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<HashMap<String, Entry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim `client` and the session's camera.
    pub fn claim(&self, client: &str, session: Arc<CameraSession>) -> CaptureResult<()> {
        let mut inner = self.inner.lock();

        if inner.contains_key(client) {
            return Err(CaptureError::DuplicateSession);
        }
        let camera_id = session.camera().id.clone();
        if inner.values().any(|entry| entry.camera_id == camera_id) {
            return Err(CaptureError::DuplicateSession);
        }

        inner.insert(client.to_string(), Entry { camera_id, session });
        Ok(())
    }

    pub fn get(&self, client: &str) -> Option<Arc<CameraSession>> {
        self.inner.lock().get(client).map(|entry| entry.session.clone())
    }

    /// Remove and return the client's session, freeing its camera claim
    pub fn release(&self, client: &str) -> Option<Arc<CameraSession>> {
        self.inner.lock().remove(client).map(|entry| entry.session)
    }

    /// Remove every session (host teardown)
    pub fn drain(&self) -> Vec<Arc<CameraSession>> {
        self.inner
            .lock()
            .drain()
            .map(|(_, entry)| entry.session)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
