//! Scene description accepted by the render pipeline.

use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{FightframeError, FightframeResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Largest canvas side accepted from a scene or from render defaults, pixels.
pub const MAX_CANVAS_SIDE: u32 = 4096;
/// Highest frame rate accepted from a scene or from render defaults.
pub const MAX_FPS: u32 = 120;
/// Output length cap for scenes without a preset, seconds.
pub const MAX_DURATION_SECS: f64 = 3600.0;

/// Reject rates above [`MAX_FPS`].
pub fn check_fps(fps: u32) -> FightframeResult<Fps> {
    if fps > MAX_FPS {
        return Err(FightframeError::validation(format!(
            "fps {fps} exceeds the limit of {MAX_FPS}"
        )));
    }
    Fps::whole(fps)
}

/// Reject canvases with a side above [`MAX_CANVAS_SIDE`].
pub fn check_canvas(width: u32, height: u32) -> FightframeResult<Canvas> {
    if width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE {
        return Err(FightframeError::validation(format!(
            "canvas {width}x{height} exceeds the limit of {MAX_CANVAS_SIDE} per side"
        )));
    }
    Canvas::new(width, height)
}

/// Named output quality profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderPreset {
    #[serde(rename = "preview")]
    Preview,
    #[serde(rename = "standard")]
    Standard,
    #[serde(rename = "4k")]
    Ultra4k,
}

impl RenderPreset {
    pub fn canvas(self) -> Canvas {
        let (width, height) = match self {
            Self::Preview => (854, 480),
            Self::Standard => (1920, 1080),
            Self::Ultra4k => (3840, 2160),
        };
        Canvas { width, height }
    }

    pub fn fps(self) -> u32 {
        match self {
            Self::Preview => 30,
            Self::Standard | Self::Ultra4k => 60,
        }
    }

    /// Longest output allowed, seconds.
    pub fn max_duration_secs(self) -> f64 {
        match self {
            Self::Preview => 300.0,
            Self::Standard => 1800.0,
            Self::Ultra4k => 3600.0,
        }
    }
}

/// Render request payload. Any JSON object is accepted; unrecognized keys land in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
    /// Effect name to parameters, applied in the order given.
    #[serde(default)]
    pub effects: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<RenderPreset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SceneData {
    pub fn from_value(value: Value) -> FightframeResult<Self> {
        if !value.is_object() {
            return Err(FightframeError::validation("scene data must be a JSON object"));
        }
        serde_json::from_value(value)
            .map_err(|e| FightframeError::validation(format!("invalid scene data: {e}")))
    }

    pub fn from_json_str(json: &str) -> FightframeResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn to_value(&self) -> FightframeResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Trimmed description, `None` when missing or blank.
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Scene fps, else the preset's, else `default_fps`.
    pub fn resolve_fps(&self, default_fps: u32) -> FightframeResult<Fps> {
        let fps = self
            .fps
            .or(self.preset.map(RenderPreset::fps))
            .unwrap_or(default_fps);
        check_fps(fps)
    }

    /// Longest output allowed for this scene, seconds.
    pub fn max_duration_secs(&self) -> f64 {
        self.preset
            .map_or(MAX_DURATION_SECS, RenderPreset::max_duration_secs)
    }

    /// Explicit size wins per axis, then the preset, then `default`.
    pub fn resolve_canvas(&self, default: Canvas) -> FightframeResult<Canvas> {
        let base = self.preset.map_or(default, RenderPreset::canvas);
        check_canvas(
            self.width.unwrap_or(base.width),
            self.height.unwrap_or(base.height),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scene.rs"]
mod tests;
