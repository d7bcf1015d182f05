//! Per-frame post-processing.

use crate::foundation::error::{FightframeError, FightframeResult};
use crate::render::frame::FrameRGBA;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How unrecognized effect names are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectsMode {
    /// Skip with a warning.
    #[default]
    Lenient,
    /// Reject with a validation error.
    Strict,
}

/// A resolved effect with its parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EffectKind {
    /// Separable gaussian blur.
    Blur { radius: u32, sigma: f32 },
    /// Scale color channels by `factor`.
    Brightness { factor: f32 },
}

const DEFAULT_BLUR_RADIUS: u32 = 2;
const MAX_BLUR_RADIUS: u32 = 64;

fn param_f32(params: &Value, key: &str) -> FightframeResult<Option<f32>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| Some(f as f32))
            .ok_or_else(|| FightframeError::validation(format!("effect param '{key}' must be a number"))),
    }
}

impl EffectKind {
    /// Resolve `name` with its JSON params. `Ok(None)` means the name is not a known effect.
    pub fn parse(name: &str, params: &Value) -> FightframeResult<Option<Self>> {
        match name {
            "blur" => {
                let radius = match params.get("radius") {
                    None | Some(Value::Null) => DEFAULT_BLUR_RADIUS,
                    Some(v) => v
                        .as_u64()
                        .filter(|r| *r <= u64::from(MAX_BLUR_RADIUS))
                        .ok_or_else(|| {
                            FightframeError::validation(format!(
                                "blur radius must be an integer in 0..={MAX_BLUR_RADIUS}"
                            ))
                        })? as u32,
                };
                let sigma = param_f32(params, "sigma")?.unwrap_or(radius.max(1) as f32 / 2.0);
                if sigma <= 0.0 {
                    return Err(FightframeError::validation("blur sigma must be > 0"));
                }
                Ok(Some(Self::Blur { radius, sigma }))
            }
            "brightness" => {
                let factor = param_f32(params, "factor")?.unwrap_or(1.0);
                if factor < 0.0 {
                    return Err(FightframeError::validation("brightness factor must be >= 0"));
                }
                Ok(Some(Self::Brightness { factor }))
            }
            _ => Ok(None),
        }
    }

    fn apply(&self, frame: &mut FrameRGBA) -> FightframeResult<()> {
        match *self {
            Self::Blur { radius, sigma } => {
                frame.data = blur_rgba8(&frame.data, frame.width, frame.height, radius, sigma)?;
            }
            Self::Brightness { factor } => brighten(&mut frame.data, factor),
        }
        Ok(())
    }
}

/// Effects resolved once per render and applied to every frame in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectChain {
    effects: Vec<EffectKind>,
}

impl EffectChain {
    pub fn new(effects: Vec<EffectKind>) -> Self {
        Self { effects }
    }

    pub fn from_scene(effects: &Map<String, Value>, mode: EffectsMode) -> FightframeResult<Self> {
        let mut chain = Vec::with_capacity(effects.len());
        for (name, params) in effects {
            match EffectKind::parse(name, params)? {
                Some(kind) => chain.push(kind),
                None if mode == EffectsMode::Strict => {
                    return Err(FightframeError::validation(format!("unknown effect '{name}'")));
                }
                None => tracing::warn!(effect = %name, "skipping unknown effect"),
            }
        }
        Ok(Self { effects: chain })
    }

    pub fn effects(&self) -> &[EffectKind] {
        &self.effects
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Run the chain over every frame, in parallel, keeping frame order.
    pub fn apply(&self, frames: Vec<FrameRGBA>) -> FightframeResult<Vec<FrameRGBA>> {
        if frames.is_empty() {
            return Err(FightframeError::validation("no frames to process"));
        }
        if self.effects.is_empty() {
            return Ok(frames);
        }
        frames
            .into_par_iter()
            .map(|mut frame| -> FightframeResult<FrameRGBA> {
                for effect in &self.effects {
                    effect.apply(&mut frame)?;
                }
                Ok(frame)
            })
            .collect()
    }
}

fn brighten(data: &mut [u8], factor: f32) {
    for px in data.chunks_exact_mut(4) {
        let a = f32::from(px[3]);
        for c in &mut px[..3] {
            // Premultiplied channels may not exceed alpha.
            *c = (f32::from(*c) * factor).round().clamp(0.0, a) as u8;
        }
    }
}

pub(crate) fn blur_rgba8(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> FightframeResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| FightframeError::validation("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(FightframeError::validation(
            "blur expects a buffer matching width*height*4",
        ));
    }
    if radius == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];
    blur_pass(src, &mut tmp, width, height, &kernel, Axis::X);
    blur_pass(&tmp, &mut out, width, height, &kernel, Axis::Y);
    Ok(out)
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> FightframeResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(FightframeError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    // Fold the rounding error into the center tap so the kernel sums to exactly 1.0.
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let mid = weights.len() / 2;
    weights[mid] = (i64::from(weights[mid]) + 65536 - acc).clamp(0, 65536) as u32;
    Ok(weights)
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

fn blur_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32], axis: Axis) {
    let radius = (k.len() / 2) as i32;
    let (w, h) = (width as i32, height as i32);
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let d = ki as i32 - radius;
                let (sx, sy) = match axis {
                    Axis::X => ((x + d).clamp(0, w - 1), y),
                    Axis::Y => (x, (y + d).clamp(0, h - 1)),
                };
                let idx = ((sy * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = (((acc[c] + 32768) >> 16).min(255)) as u8;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/effects.rs"]
mod tests;
