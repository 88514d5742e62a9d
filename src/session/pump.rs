//! Frame pump
//!
//! Moves frames off the camera delivery context as fast as possible: the
//! sink copies each borrowed frame exactly once and enqueues it, and a
//! dedicated delivery task encodes the payload and emits it on the
//! persistent callback handle. Consumer processing time therefore never
//! blocks capture callbacks. A full queue drops the frame; platform-level
//! capture failures are logged and skipped. Neither ends the session.

use crate::bridge::CallbackHandle;
use crate::platform::{Facing, Frame, FrameSink};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Delivery queue depth, matching the preview target's buffer count
pub(crate) const DELIVERY_QUEUE_DEPTH: usize = 10;

/// An owned copy of one captured frame, queued for delivery
struct QueuedFrame {
    jpeg: Vec<u8>,
    metadata: Option<serde_json::Map<String, Value>>,
}

/// Owns the delivery task for one session
pub(crate) struct FramePump {
    sink: Arc<DeliverySink>,
    worker: JoinHandle<()>,
}

impl FramePump {
    /// Spawn the delivery task. Must be called from within the runtime.
    pub(crate) fn spawn(handle: Arc<dyn CallbackHandle>, facing: Facing) -> Self {
        let (tx, mut rx) = mpsc::channel::<QueuedFrame>(DELIVERY_QUEUE_DEPTH);

        let worker = tokio::spawn(async move {
            let mut delivered: u64 = 0;
            while let Some(frame) = rx.recv().await {
                handle.frame(frame_payload(&frame.jpeg, frame.metadata.as_ref(), facing));
                delivered += 1;
            }
            tracing::debug!("frame delivery task exiting after {delivered} frames");
        });

        Self {
            sink: Arc::new(DeliverySink { tx }),
            worker,
        }
    }

    /// The sink to hand to the platform's repeating request
    pub(crate) fn sink(&self) -> Arc<dyn FrameSink> {
        self.sink.clone()
    }

    /// Stop delivery. Frames still queued are discarded; the session is
    /// over and the handle must not receive further results.
    pub(crate) fn shutdown(self) {
        self.worker.abort();
    }
}

/// Platform-facing end of the pump
struct DeliverySink {
    tx: mpsc::Sender<QueuedFrame>,
}

impl FrameSink for DeliverySink {
    fn on_frame(&self, frame: Frame<'_>) {
        let queued = QueuedFrame {
            jpeg: frame.data.to_vec(),
            metadata: frame.metadata.cloned(),
        };
        if self.tx.try_send(queued).is_err() {
            // Queue full or pump shut down; dropping a frame is tolerated
            tracing::warn!("frame dropped: delivery queue unavailable");
        }
    }

    fn on_capture_failed(&self, reason: &str) {
        tracing::warn!("capture failed: {reason}");
    }
}

/// Build the per-frame payload delivered over the open callback handle
pub(crate) fn frame_payload(
    jpeg: &[u8],
    metadata: Option<&serde_json::Map<String, Value>>,
    facing: Facing,
) -> Value {
    let data_uri = format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg));

    let mut fullsize = serde_json::Map::new();
    fullsize.insert("data".to_string(), Value::String(data_uri));
    if let Some(metadata) = metadata {
        fullsize.insert("metadata".to_string(), Value::Object(metadata.clone()));
    }
    fullsize.insert(
        "cameraFacing".to_string(),
        Value::String(facing.to_string()),
    );

    json!({ "output": { "images": { "fullsize": fullsize } } })
}
