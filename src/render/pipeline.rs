use crate::encode::{FrameSink, SinkConfig, sink_for_target};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{FightframeError, FightframeResult, RenderStage};
use crate::render::effects::{EffectChain, EffectsMode};
use crate::render::frame::FrameRGBA;
use crate::render::interpolate::interpolate_frames;
use crate::render::keyframes::{KeyframeModel, ProceduralKeyframes};
use crate::render::scene::{SceneData, check_canvas, check_fps};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Receives stage progress from a render.
///
/// Percentages arrive in non-decreasing order: 25, 50, 75, 90, then 100 on success. A failing
/// `report` aborts the render with that error.
pub trait ProgressObserver {
    fn report(&mut self, percent: u8, message: &str) -> FightframeResult<()>;

    /// Called once with the failure text before a stage error propagates.
    fn fail(&mut self, message: &str) -> FightframeResult<()> {
        self.report(0, message)
    }
}

impl<F> ProgressObserver for F
where
    F: FnMut(u8, &str) -> FightframeResult<()>,
{
    fn report(&mut self, percent: u8, message: &str) -> FightframeResult<()> {
        self(percent, message)
    }
}

/// Render defaults applied when the scene does not say otherwise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOpts {
    pub default_fps: u32,
    pub canvas: Canvas,
    pub effects_mode: EffectsMode,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            default_fps: 30,
            canvas: Canvas::default(),
            effects_mode: EffectsMode::Lenient,
        }
    }
}

impl RenderOpts {
    pub fn validate(&self) -> FightframeResult<()> {
        check_fps(self.default_fps)?;
        check_canvas(self.canvas.width, self.canvas.height)?;
        Ok(())
    }
}

/// Summary of a successful render.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Output location, when rendered to a path.
    pub output: Option<PathBuf>,
    pub keyframes: usize,
    /// Frames handed to the sink.
    pub frames: usize,
}

/// Four-stage renderer: keyframes, interpolation, effects, encoding.
#[derive(Clone)]
pub struct AnimationGenerator {
    model: Arc<dyn KeyframeModel>,
    opts: RenderOpts,
}

impl std::fmt::Debug for AnimationGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationGenerator")
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

impl AnimationGenerator {
    pub fn new(model: Arc<dyn KeyframeModel>, opts: RenderOpts) -> FightframeResult<Self> {
        opts.validate()?;
        Ok(Self { model, opts })
    }

    /// Generator backed by [`ProceduralKeyframes`].
    pub fn procedural(opts: RenderOpts) -> FightframeResult<Self> {
        Self::new(Arc::new(ProceduralKeyframes), opts)
    }

    pub fn opts(&self) -> &RenderOpts {
        &self.opts
    }

    /// Render `scene` to `output_target`: an `.mp4` file or a PNG frame directory.
    pub fn render_animation(
        &self,
        scene: &SceneData,
        output_target: &Path,
        observer: &mut dyn ProgressObserver,
    ) -> FightframeResult<RenderOutput> {
        let mut sink = sink_for_target(output_target);
        let mut out = self.render_animation_into(scene, sink.as_mut(), observer)?;
        out.output = Some(output_target.to_path_buf());
        tracing::info!(output = %output_target.display(), frames = out.frames, "animation rendered");
        Ok(out)
    }

    /// Render `scene` into an arbitrary sink.
    #[tracing::instrument(skip_all, fields(animation_id = scene.animation_id.as_deref().unwrap_or("-")))]
    pub fn render_animation_into(
        &self,
        scene: &SceneData,
        sink: &mut dyn FrameSink,
        observer: &mut dyn ProgressObserver,
    ) -> FightframeResult<RenderOutput> {
        observer.report(25, "Generating keyframes")?;
        let keyframes = run_stage(RenderStage::Keyframes, observer, || {
            self.generate_keyframes(scene)
        })?;
        let keyframe_count = keyframes.len();

        observer.report(50, "Interpolating frames")?;
        let (frames, fps) = run_stage(RenderStage::Interpolation, observer, || {
            let fps = scene.resolve_fps(self.opts.default_fps)?;
            let expected = (keyframes.len() as u64).saturating_sub(1) * fps.half_second_frames();
            let secs = fps.frames_to_secs(expected);
            let limit = scene.max_duration_secs();
            if secs > limit {
                return Err(FightframeError::validation(format!(
                    "animation runs {secs:.1}s, limit is {limit:.0}s"
                )));
            }
            Ok((interpolate_frames(&keyframes, fps)?, fps))
        })?;
        drop(keyframes);

        observer.report(75, "Applying effects")?;
        let frames = run_stage(RenderStage::Effects, observer, || {
            EffectChain::from_scene(&scene.effects, self.opts.effects_mode)?.apply(frames)
        })?;

        observer.report(90, "Saving animation")?;
        let written = run_stage(RenderStage::Encoding, observer, || {
            encode_frames(sink, &frames, fps)
        })?;

        observer.report(100, "Complete")?;
        Ok(RenderOutput {
            output: None,
            keyframes: keyframe_count,
            frames: written,
        })
    }

    fn generate_keyframes(&self, scene: &SceneData) -> FightframeResult<Vec<FrameRGBA>> {
        let description = scene
            .description()
            .ok_or_else(|| FightframeError::validation("scene description is required"))?;
        let canvas = scene.resolve_canvas(self.opts.canvas)?;
        let keyframes = self.model.generate(description, canvas)?;
        if keyframes.is_empty() {
            return Err(FightframeError::validation(
                "keyframe model produced no keyframes",
            ));
        }
        tracing::debug!(keyframes = keyframes.len(), "keyframes generated");
        Ok(keyframes)
    }
}

fn run_stage<T>(
    stage: RenderStage,
    observer: &mut dyn ProgressObserver,
    f: impl FnOnce() -> FightframeResult<T>,
) -> FightframeResult<T> {
    f().map_err(|source| {
        let err = FightframeError::render(stage, source);
        let message = format!("Animation rendering failed: {err}");
        tracing::error!("{message}");
        if let Err(e) = observer.fail(&message) {
            tracing::warn!(error = %e, "progress observer rejected failure report");
        }
        err
    })
}

fn encode_frames(sink: &mut dyn FrameSink, frames: &[FrameRGBA], fps: Fps) -> FightframeResult<usize> {
    let Some(first) = frames.first() else {
        return Err(FightframeError::validation("no frames to save"));
    };
    sink.begin(SinkConfig {
        width: first.width,
        height: first.height,
        fps,
    })?;
    for (i, frame) in frames.iter().enumerate() {
        sink.push_frame(FrameIndex(i as u64), frame)?;
    }
    sink.end()?;
    Ok(frames.len())
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
