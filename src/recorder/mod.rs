//! Recording system module
//!
//! Owns the encoder lifecycle on behalf of a session: the recorder is
//! constructed unprepared at session start so its persistent input target
//! can join capture-session negotiation, and is prepared/started only when
//! recording actually begins.

use crate::error::{CaptureError, CaptureResult};
use crate::platform::{CameraPlatform, EncoderSettings, OutputTarget, VideoRecorder};
use crate::session::CaptureOptions;
use chrono::{DateTime, Local, TimeZone};
use std::path::PathBuf;

/// H.264 encoding bitrate used for every recording
const RECORDER_VIDEO_BITRATE: u32 = 10_000_000;

/// Encoder lifecycle controller for one session
pub struct RecorderController {
    recorder: Box<dyn VideoRecorder>,
    media_dir: PathBuf,
    artifact: Option<PathBuf>,
    recording: bool,
}

impl RecorderController {
    /// Construct the platform encoder, unprepared. Its input target is
    /// available immediately.
    pub fn new(
        platform: &dyn CameraPlatform,
        options: &CaptureOptions,
        media_dir: PathBuf,
    ) -> CaptureResult<Self> {
        let settings = EncoderSettings {
            width: options.capture_width,
            height: options.capture_height,
            fps: options.fps,
            video_bitrate: RECORDER_VIDEO_BITRATE,
        };
        let recorder = platform
            .new_recorder(&settings)
            .map_err(|err| CaptureError::EncoderFailure(err.to_string()))?;

        Ok(Self {
            recorder,
            media_dir,
            artifact: None,
            recording: false,
        })
    }

    /// The persistent encoder input target, valid before `prepare`
    pub fn input_target(&self) -> OutputTarget {
        self.recorder.input_target()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Prepare and start the encoder, binding a freshly named artifact.
    ///
    /// The artifact path is set lazily here, on first record start.
    pub async fn start(&mut self) -> CaptureResult<PathBuf> {
        if self.recording {
            return Err(CaptureError::InvalidState(
                "recorder is already recording".to_string(),
            ));
        }

        let artifact = self.media_dir.join(artifact_name(Local::now()));
        self.recorder
            .prepare(&artifact)
            .await
            .map_err(|err| CaptureError::EncoderFailure(err.to_string()))?;
        self.recorder
            .start()
            .await
            .map_err(|err| CaptureError::EncoderFailure(err.to_string()))?;

        tracing::info!("recording to {}", artifact.display());
        self.artifact = Some(artifact.clone());
        self.recording = true;
        Ok(artifact)
    }

    /// Finalize the encoder and yield the artifact path.
    ///
    /// A no-op (`Ok(None)`) when not recording. On encoder failure the
    /// partial artifact is discarded and `EncoderFailure` is returned.
    pub async fn stop(&mut self) -> CaptureResult<Option<PathBuf>> {
        if !self.recording {
            return Ok(None);
        }
        self.recording = false;

        let finalized = self.recorder.stop().await;
        self.recorder.release();

        match finalized {
            Ok(()) => {
                let artifact = self.artifact.take();
                if let Some(path) = &artifact {
                    tracing::info!("recording finalized: {}", path.display());
                }
                Ok(artifact)
            }
            Err(err) => {
                self.artifact = None;
                Err(CaptureError::EncoderFailure(err.to_string()))
            }
        }
    }
}

/// Artifact file name for a recording started at `now`
fn artifact_name<Tz: TimeZone>(now: DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("VID_{}.mp4", now.format("%Y_%m_%d_%H_%M_%S_%3f"))
}
