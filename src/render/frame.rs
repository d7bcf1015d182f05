use crate::foundation::core::Canvas;
use crate::foundation::error::{FightframeError, FightframeResult};

/// A rendered RGBA8 frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Opaque frame filled with `rgb`.
    pub fn solid(canvas: Canvas, rgb: [u8; 3]) -> Self {
        let px = [rgb[0], rgb[1], rgb[2], 255];
        Self {
            width: canvas.width,
            height: canvas.height,
            data: px.repeat(canvas.width as usize * canvas.height as usize),
            premultiplied: true,
        }
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Check that `data` matches `width * height * 4`.
    pub fn validate(&self) -> FightframeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FightframeError::validation("frame width/height must be non-zero"));
        }
        if self.data.len() != self.canvas().rgba_len() {
            return Err(FightframeError::validation(format!(
                "frame data is {} bytes, expected {}x{}x4",
                self.data.len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = self.data.get(i..i + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }

    /// Straight-alpha copy of the pixel data.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        if !self.premultiplied {
            return self.data.clone();
        }
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = u32::from(px[3]);
            if a == 0 {
                px[..3].fill(0);
            } else if a < 255 {
                for c in &mut px[..3] {
                    *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
        out
    }
}
