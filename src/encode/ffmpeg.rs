use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{FightframeError, FightframeResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::frame::FrameRGBA;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Background used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
        }
    }

    /// `ffmpeg` invocation reading raw RGBA frames of `cfg` from stdin.
    fn command(&self, cfg: &SinkConfig) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.arg(if self.overwrite { "-y" } else { "-n" })
            .args(["-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgba"])
            .arg("-s")
            .arg(format!("{}x{}", cfg.width, cfg.height))
            .arg("-r")
            .arg(format!("{}/{}", cfg.fps.num, cfg.fps.den))
            .args(["-i", "pipe:0", "-an", "-c:v", "libx264", "-pix_fmt", "yuv420p"])
            .args(["-movflags", "+faststart"])
            .arg(&self.out_path);
        cmd
    }
}

/// A spawned encoder: stdin carries frames, a helper thread collects stderr.
///
/// The child is always reaped. Dropping an unfinished process kills it.
struct EncoderProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<Vec<u8>>>,
    reaped: bool,
}

impl EncoderProcess {
    fn spawn(mut cmd: Command) -> FightframeResult<Self> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        let mut child = cmd.spawn().map_err(|e| {
            FightframeError::encoding(format!("failed to start encoder {:?}: {e}", cmd.get_program()))
        })?;
        let stdin = child.stdin.take();
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut bytes = Vec::new();
                // Whatever arrived before a read error is still worth reporting.
                let _ = pipe.read_to_end(&mut bytes);
                bytes
            })
        });
        let mut process = Self {
            child,
            stdin,
            stderr,
            reaped: false,
        };
        if process.stdin.is_none() {
            let stderr = process.abort();
            return Err(FightframeError::encoding(with_stderr(
                "encoder stdin is not available".to_owned(),
                &stderr,
            )));
        }
        Ok(process)
    }

    fn id(&self) -> u32 {
        self.child.id()
    }

    /// Stream `bytes` to the encoder. On failure the encoder is stopped and its stderr is
    /// folded into the error.
    fn write(&mut self, bytes: &[u8]) -> FightframeResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(FightframeError::encoding("encoder input is already closed"));
        };
        if let Err(e) = stdin.write_all(bytes) {
            let stderr = self.abort();
            return Err(FightframeError::encoding(with_stderr(
                format!("failed to write frame to encoder: {e}"),
                &stderr,
            )));
        }
        Ok(())
    }

    /// Close stdin and wait for a clean exit.
    fn finish(mut self) -> FightframeResult<()> {
        drop(self.stdin.take());
        let status = self.reap();
        let stderr = self.collect_stderr();
        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(FightframeError::encoding(with_stderr(
                format!("encoder exited with {status}"),
                &stderr,
            ))),
            Err(e) => Err(FightframeError::encoding(with_stderr(
                format!("failed to wait for encoder: {e}"),
                &stderr,
            ))),
        }
    }

    /// Kill the encoder, reap it, and return what it wrote to stderr.
    fn abort(&mut self) -> String {
        drop(self.stdin.take());
        if !self.reaped {
            // Fails only when the child already exited, which `reap` handles.
            let _ = self.child.kill();
            if let Err(e) = self.reap() {
                tracing::warn!(pid = self.id(), error = %e, "could not reap encoder");
            }
        }
        self.collect_stderr()
    }

    fn reap(&mut self) -> std::io::Result<ExitStatus> {
        let status = self.child.wait();
        self.reaped = true;
        status
    }

    fn collect_stderr(&mut self) -> String {
        let bytes = match self.stderr.take().map(JoinHandle::join) {
            Some(Ok(bytes)) => bytes,
            Some(Err(_)) => b"<stderr reader panicked>".to_vec(),
            None => Vec::new(),
        };
        String::from_utf8_lossy(&bytes).trim().to_owned()
    }
}

impl Drop for EncoderProcess {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        let pid = self.id();
        let stderr = self.abort();
        tracing::warn!(pid, stderr = %stderr, "encoder stopped before its output was finished");
    }
}

fn with_stderr(message: String, stderr: &str) -> String {
    if stderr.is_empty() {
        message
    } else {
        format!("{message}: {stderr}")
    }
}

/// Streams frames to the system `ffmpeg` as h264 MP4.
///
/// A sink dropped before `end` kills its `ffmpeg` process.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    process: Option<EncoderProcess>,
    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            process: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }

    fn check_config(&self, cfg: &SinkConfig) -> FightframeResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(FightframeError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        // yuv420p subsamples chroma by two on both axes.
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(FightframeError::validation(
                "ffmpeg sink width/height must be even for yuv420p output",
            ));
        }
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(FightframeError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        Ok(())
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> FightframeResult<()> {
        self.check_config(&cfg)?;
        ensure_parent_dir(&self.opts.out_path)?;
        if !is_ffmpeg_on_path() {
            return Err(FightframeError::encoding(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        if let Some(mut stale) = self.process.take() {
            stale.abort();
        }
        let process = EncoderProcess::spawn(self.opts.command(&cfg))?;
        tracing::debug!(
            pid = process.id(),
            out = %self.opts.out_path.display(),
            width = cfg.width,
            height = cfg.height,
            "ffmpeg started"
        );
        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.process = Some(process);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> FightframeResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| FightframeError::encoding("ffmpeg sink not started"))?;
        if self.last_idx.is_some_and(|last| idx.0 <= last.0) {
            return Err(FightframeError::encoding(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(FightframeError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        flatten_premul_over_bg(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;

        let process = self
            .process
            .as_mut()
            .ok_or_else(|| FightframeError::encoding("ffmpeg sink is already finalized"))?;
        if let Err(e) = process.write(&self.scratch) {
            self.process = None;
            self.cfg = None;
            return Err(e);
        }
        self.last_idx = Some(idx);
        Ok(())
    }

    fn end(&mut self) -> FightframeResult<()> {
        let process = self
            .process
            .take()
            .ok_or_else(|| FightframeError::encoding("ffmpeg sink not started"))?;
        self.cfg = None;
        process.finish()?;
        tracing::debug!(out = %self.opts.out_path.display(), "ffmpeg finished");
        Ok(())
    }
}

fn flatten_premul_over_bg(dst: &mut [u8], src_premul: &[u8], bg_rgba: [u8; 4]) -> FightframeResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(FightframeError::validation(
            "frame data size mismatch with width*height*4",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let inv = 255u16 - u16::from(s[3]);
        for c in 0..3 {
            let v = u16::from(s[c]) + mul_div255_u16(u16::from(bg_rgba[c]), inv);
            d[c] = v.min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> FightframeResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
