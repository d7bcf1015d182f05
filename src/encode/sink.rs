use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{FightframeError, FightframeResult};
use crate::render::frame::FrameRGBA;
use std::path::{Path, PathBuf};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
}

/// Sink contract for consuming rendered frames in playback order.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> FightframeResult<()>;
    /// Push one frame in strictly increasing order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> FightframeResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> FightframeResult<()>;
}

fn check_frame(cfg: &SinkConfig, frame: &FrameRGBA) -> FightframeResult<()> {
    if frame.width != cfg.width || frame.height != cfg.height {
        return Err(FightframeError::validation(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width, frame.height, cfg.width, cfg.height
        )));
    }
    frame.validate()
}

fn check_order(last: Option<FrameIndex>, idx: FrameIndex) -> FightframeResult<()> {
    if let Some(last) = last
        && idx.0 <= last.0
    {
        return Err(FightframeError::encoding(format!(
            "out-of-order frame index {} after {}",
            idx.0, last.0
        )));
    }
    Ok(())
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    finished: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    /// `true` once `end` ran.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> FightframeResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> FightframeResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| FightframeError::encoding("in-memory sink not started"))?;
        check_frame(cfg, frame)?;
        check_order(self.frames.last().map(|(i, _)| *i), idx)?;
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> FightframeResult<()> {
        self.finished = true;
        Ok(())
    }
}

fn is_frame_file(name: &str) -> bool {
    name.strip_prefix("frame_")
        .and_then(|rest| rest.strip_suffix(".png"))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Delete `frame_*.png` left in `dir`; other files are kept.
fn remove_stale_frames(dir: &Path) -> FightframeResult<usize> {
    use anyhow::Context as _;
    let mut removed = 0;
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list output directory '{}'", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list '{}'", dir.display()))?;
        let name = entry.file_name();
        if !name.to_str().is_some_and(is_frame_file) || !entry.path().is_file() {
            continue;
        }
        std::fs::remove_file(entry.path())
            .with_context(|| format!("failed to remove stale frame '{}'", entry.path().display()))?;
        removed += 1;
    }
    Ok(removed)
}

/// Writes `frame_00000.png`, `frame_00001.png`, ... into a directory. Frames from an earlier
/// render in the same directory are removed in `begin`.
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    written: usize,
}

impl PngSequenceSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cfg: None,
            last_idx: None,
            written: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn frame_path(&self, idx: FrameIndex) -> PathBuf {
        self.dir.join(format!("frame_{:05}.png", idx.0))
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, cfg: SinkConfig) -> FightframeResult<()> {
        use anyhow::Context as _;
        if cfg.width == 0 || cfg.height == 0 {
            return Err(FightframeError::validation(
                "png sink width/height must be non-zero",
            ));
        }
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create output directory '{}'", self.dir.display()))?;
        let stale = remove_stale_frames(&self.dir)?;
        if stale > 0 {
            tracing::debug!(dir = %self.dir.display(), stale, "removed frames from an earlier render");
        }
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.written = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> FightframeResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| FightframeError::encoding("png sink not started"))?;
        check_frame(cfg, frame)?;
        check_order(self.last_idx, idx)?;
        self.last_idx = Some(idx);

        let path = self.frame_path(idx);
        let img = image::RgbaImage::from_raw(frame.width, frame.height, frame.to_straight_rgba8())
            .ok_or_else(|| FightframeError::encoding("frame buffer does not fit its dimensions"))?;
        img.save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| {
                FightframeError::encoding(format!("failed to write '{}': {e}", path.display()))
            })?;
        self.written += 1;
        Ok(())
    }

    fn end(&mut self) -> FightframeResult<()> {
        if self.cfg.take().is_none() {
            return Err(FightframeError::encoding("png sink not started"));
        }
        tracing::debug!(dir = %self.dir.display(), frames = self.written, "png sequence written");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
