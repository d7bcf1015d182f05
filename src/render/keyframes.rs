//! Text-to-keyframe generation.

use crate::foundation::core::Canvas;
use crate::foundation::error::{FightframeError, FightframeResult};
use crate::render::frame::FrameRGBA;
use xxhash_rust::xxh3::xxh3_64;

/// Turns a scene description into keyframes.
///
/// Stands in for the text-to-image model: implementations must return at least one keyframe per
/// scene element, each sized to `canvas`.
pub trait KeyframeModel: Send + Sync {
    fn generate(&self, description: &str, canvas: Canvas) -> FightframeResult<Vec<FrameRGBA>>;
}

const STOP_WORDS: [&str; 24] = [
    "and", "the", "for", "with", "into", "onto", "from", "over", "under", "then", "that", "this",
    "are", "was", "were", "his", "her", "its", "their", "they", "them", "but", "while", "upon",
];

/// Words of three or more letters that are not stop words, lowercased, in order.
pub fn scene_elements(description: &str) -> Vec<String> {
    description
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| w.chars().count() >= 3 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Deterministic keyframes: one per scene element, colored and composed from the element's hash.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProceduralKeyframes;

impl ProceduralKeyframes {
    fn draw(element: &str, canvas: Canvas) -> FrameRGBA {
        let h = xxh3_64(element.as_bytes());
        let byte = |shift: u32| ((h >> shift) & 0xff) as u8;
        let bg = [byte(0) / 2, byte(8) / 2, byte(16) / 2];
        let fg = [byte(24) | 0x80, byte(32) | 0x80, byte(40) | 0x80];

        let (w, ht) = (canvas.width as f64, canvas.height as f64);
        let cx = w * (0.25 + 0.5 * f64::from(byte(48)) / 255.0);
        let cy = ht * (0.25 + 0.5 * f64::from(byte(56)) / 255.0);
        let r = w.min(ht) * 0.2;

        let mut frame = FrameRGBA::solid(canvas, bg);
        for (i, px) in frame.data.chunks_exact_mut(4).enumerate() {
            let x = (i % canvas.width as usize) as f64 + 0.5;
            let y = (i / canvas.width as usize) as f64 + 0.5;
            if (x - cx).hypot(y - cy) <= r {
                px[..3].copy_from_slice(&fg);
            }
        }
        frame
    }
}

impl KeyframeModel for ProceduralKeyframes {
    fn generate(&self, description: &str, canvas: Canvas) -> FightframeResult<Vec<FrameRGBA>> {
        let elements = scene_elements(description);
        if elements.is_empty() {
            return Err(FightframeError::validation(format!(
                "scene description '{description}' has no scene elements"
            )));
        }
        Ok(elements.iter().map(|e| Self::draw(e, canvas)).collect())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/keyframes.rs"]
mod tests;
