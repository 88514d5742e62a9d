//! Capture options
//!
//! Immutable configuration snapshot built once from the caller's JSON
//! payload and never mutated after the session starts. Top-level `width`
//! and `height` cascade into both the canvas (preview) and capture
//! (recording) dimensions; the nested `canvas` and `capture` objects then
//! override their own pair. Unrecognized keys are ignored.

use crate::error::{CaptureError, CaptureResult};
use crate::platform::{Facing, FlashMode};
use serde::Serialize;
use serde_json::Value;

/// Effective capture configuration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOptions {
    /// Consumer usage hint, passed through verbatim
    #[serde(rename = "use")]
    pub usage: String,

    /// Requested capture frame rate
    pub fps: u32,

    pub width: u32,
    pub height: u32,

    /// Preview (canvas) dimensions
    pub canvas_width: u32,
    pub canvas_height: u32,

    /// Recording dimensions
    pub capture_width: u32,
    pub capture_height: u32,

    pub has_thumbnail: bool,
    pub thumbnail_ratio: f64,

    pub flash_mode: FlashMode,
    pub camera_facing: Facing,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            usage: "data".to_string(),
            fps: 30,
            width: 352,
            height: 288,
            canvas_width: 352,
            canvas_height: 288,
            capture_width: 352,
            capture_height: 288,
            has_thumbnail: false,
            thumbnail_ratio: 1.0 / 6.0,
            flash_mode: FlashMode::Off,
            camera_facing: Facing::Front,
        }
    }
}

impl CaptureOptions {
    /// Parse an options payload, keeping documented defaults for missing
    /// keys. A `null` payload keeps every default; any other non-object is
    /// `InvalidOptions`, as is a recognized key with the wrong JSON type.
    pub fn parse(payload: &Value) -> CaptureResult<Self> {
        let mut options = Self::default();

        let obj = match payload {
            Value::Null => return Ok(options),
            Value::Object(obj) => obj,
            other => {
                return Err(CaptureError::InvalidOptions(format!(
                    "expected an object, got {other}"
                )))
            }
        };

        if let Some(usage) = str_field(obj, "use")? {
            options.usage = usage.to_string();
        }

        if let Some(torch) = bool_field(obj, "flashMode")? {
            options.flash_mode = if torch { FlashMode::Torch } else { FlashMode::Off };
        }

        if let Some(facing) = str_field(obj, "cameraFacing")? {
            options.camera_facing = if facing == "front" {
                Facing::Front
            } else {
                Facing::Back
            };
        }

        if let Some(fps) = int_field(obj, "fps")? {
            options.fps = fps;
        }

        // width/height set both canvas and capture dimensions
        if let Some(width) = int_field(obj, "width")? {
            options.width = width;
            options.canvas_width = width;
            options.capture_width = width;
        }
        if let Some(height) = int_field(obj, "height")? {
            options.height = height;
            options.canvas_height = height;
            options.capture_height = height;
        }

        if let Some(has_thumbnail) = bool_field(obj, "hasThumbnail")? {
            options.has_thumbnail = has_thumbnail;
        }
        if let Some(ratio) = float_field(obj, "thumbnailRatio")? {
            options.thumbnail_ratio = ratio;
        }

        // canvas / capture objects override their own pair
        if let Some(canvas) = object_field(obj, "canvas")? {
            if let Some(width) = int_field(canvas, "width")? {
                options.canvas_width = width;
            }
            if let Some(height) = int_field(canvas, "height")? {
                options.canvas_height = height;
            }
        }

        if let Some(capture) = object_field(obj, "capture")? {
            if let Some(width) = int_field(capture, "width")? {
                options.capture_width = width;
            }
            if let Some(height) = int_field(capture, "height")? {
                options.capture_height = height;
            }
        }

        Ok(options)
    }
}

type JsonObject = serde_json::Map<String, Value>;

fn wrong_type(key: &str, expected: &str) -> CaptureError {
    CaptureError::InvalidOptions(format!("'{key}' must be {expected}"))
}

fn int_field(obj: &JsonObject, key: &str) -> CaptureResult<Option<u32>> {
    match obj.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| wrong_type(key, "a non-negative integer")),
    }
}

fn float_field(obj: &JsonObject, key: &str) -> CaptureResult<Option<f64>> {
    match obj.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| wrong_type(key, "a number")),
    }
}

fn bool_field(obj: &JsonObject, key: &str) -> CaptureResult<Option<bool>> {
    match obj.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_bool()
            .map(Some)
            .ok_or_else(|| wrong_type(key, "a boolean")),
    }
}

fn str_field<'a>(obj: &'a JsonObject, key: &str) -> CaptureResult<Option<&'a str>> {
    match obj.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| wrong_type(key, "a string")),
    }
}

fn object_field<'a>(obj: &'a JsonObject, key: &str) -> CaptureResult<Option<&'a JsonObject>> {
    match obj.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_object()
            .map(Some)
            .ok_or_else(|| wrong_type(key, "an object")),
    }
}
