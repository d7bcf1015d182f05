use crate::foundation::core::Fps;
use crate::foundation::error::{FightframeError, FightframeResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::frame::FrameRGBA;
use rayon::prelude::*;

/// Per-channel blend `a * (1 - t) + b * t` in 8-bit fixed point.
pub(crate) fn crossfade(a: [u8; 4], b: [u8; 4], t: f32) -> [u8; 4] {
    let t = t.clamp(0.0, 1.0);
    let tt = ((t * 255.0).round() as i32).clamp(0, 255) as u16;
    let it = 255u16 - tt;

    let mut out = [0u8; 4];
    for i in 0..4 {
        let av = mul_div255_u16(u16::from(a[i]), it);
        let bv = mul_div255_u16(u16::from(b[i]), tt);
        out[i] = (av + bv).min(255) as u8;
    }
    out
}

fn blend(a: &FrameRGBA, b: &FrameRGBA, t: f32) -> FrameRGBA {
    let data = a
        .data
        .chunks_exact(4)
        .zip(b.data.chunks_exact(4))
        .flat_map(|(pa, pb)| crossfade([pa[0], pa[1], pa[2], pa[3]], [pb[0], pb[1], pb[2], pb[3]], t))
        .collect();
    FrameRGBA {
        width: a.width,
        height: a.height,
        data,
        premultiplied: a.premultiplied,
    }
}

/// Blend consecutive keyframe pairs over a half-second window.
///
/// Each pair yields `n = floor(fps / 2)` frames at alpha `t / n` for `t` in `0..n`, so the output
/// holds `(keyframes - 1) * n` frames and the final keyframe itself is never emitted.
#[tracing::instrument(skip(keyframes), fields(keyframes = keyframes.len()))]
pub fn interpolate_frames(keyframes: &[FrameRGBA], fps: Fps) -> FightframeResult<Vec<FrameRGBA>> {
    if keyframes.len() < 2 {
        return Err(FightframeError::validation(format!(
            "at least two keyframes are required, got {}",
            keyframes.len()
        )));
    }
    let first = &keyframes[0];
    for k in keyframes {
        k.validate()?;
        if k.canvas() != first.canvas() || k.premultiplied != first.premultiplied {
            return Err(FightframeError::validation(
                "keyframes must share size and alpha mode",
            ));
        }
    }

    let n = usize::try_from(fps.half_second_frames())
        .map_err(|_| FightframeError::validation("interpolation window too large"))?;
    let pairs = keyframes.len() - 1;
    let frames: Vec<FrameRGBA> = (0..pairs * n)
        .into_par_iter()
        .map(|k| {
            let (pair, step) = (k / n, k % n);
            let alpha = step as f32 / n as f32;
            blend(&keyframes[pair], &keyframes[pair + 1], alpha)
        })
        .collect();
    tracing::debug!(frames = frames.len(), per_pair = n, "interpolated");
    Ok(frames)
}

#[cfg(test)]
#[path = "../../tests/unit/render/interpolate.rs"]
mod tests;
