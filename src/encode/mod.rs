//! Frame sinks: in-memory capture, PNG sequences and `ffmpeg` MP4 output.

pub mod ffmpeg;
pub mod sink;

pub use ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use sink::{FrameSink, InMemorySink, PngSequenceSink, SinkConfig};

use std::path::Path;

/// Pick the sink for an output target: `.mp4` streams to ffmpeg, anything else is a PNG directory.
pub fn sink_for_target(target: &Path) -> Box<dyn FrameSink> {
    let is_mp4 = target
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp4"));
    if is_mp4 {
        Box::new(FfmpegSink::new(FfmpegSinkOpts::new(target)))
    } else {
        Box::new(PngSequenceSink::new(target))
    }
}
