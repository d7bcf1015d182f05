//! Render job executed on a dispatcher worker.

use crate::foundation::error::{FightframeError, FightframeResult};
use crate::jobs::dispatcher::{Job, JobContext};
use crate::jobs::store::AnimationStore;
use crate::render::{AnimationGenerator, ProgressObserver, SceneData};
use std::path::PathBuf;
use std::sync::Arc;

pub const CANCELLED_MESSAGE: &str = "render cancelled";

/// Progress observer that mirrors pipeline progress into the record and the task board.
///
/// The record is written first. If that write fails the render aborts, so the board never
/// shows progress the record does not have.
pub struct JobReporter {
    store: Arc<dyn AnimationStore>,
    animation_id: u64,
    ctx: JobContext,
}

impl JobReporter {
    pub fn new(store: Arc<dyn AnimationStore>, animation_id: u64, ctx: JobContext) -> Self {
        Self {
            store,
            animation_id,
            ctx,
        }
    }
}

impl ProgressObserver for JobReporter {
    fn report(&mut self, percent: u8, message: &str) -> FightframeResult<()> {
        if self.ctx.is_cancelled() {
            return Err(FightframeError::cancelled(CANCELLED_MESSAGE));
        }
        self.store
            .update(self.animation_id, &mut |a| a.record_progress(percent))?;
        self.ctx.set_progress(percent, message)
    }

    // Failure text goes to the board message only; persisted progress keeps its last value.
    fn fail(&mut self, message: &str) -> FightframeResult<()> {
        self.ctx.note(message)
    }
}

/// Renders one animation's scene and records the outcome on its record.
pub struct RenderJob {
    pub animation_id: u64,
    pub scene: SceneData,
    pub target: PathBuf,
    pub generator: Arc<AnimationGenerator>,
    pub store: Arc<dyn AnimationStore>,
}

impl RenderJob {
    fn mark_failed(&self, message: String) {
        if let Err(e) = self
            .store
            .update(self.animation_id, &mut |a| a.fail(message.clone()))
        {
            tracing::error!(
                animation_id = self.animation_id,
                error = %e,
                "could not record render failure"
            );
        }
    }
}

impl Job for RenderJob {
    #[tracing::instrument(skip_all, fields(animation_id = self.animation_id, task = %ctx.id()))]
    fn run(self: Box<Self>, ctx: JobContext) -> FightframeResult<String> {
        let cancelled = ctx.clone();
        let mut reporter = JobReporter::new(Arc::clone(&self.store), self.animation_id, ctx);

        let rendered = self
            .generator
            .render_animation(&self.scene, &self.target, &mut reporter);
        match rendered {
            Ok(out) => {
                let output = out
                    .output
                    .unwrap_or_else(|| self.target.clone())
                    .display()
                    .to_string();
                let completed = self
                    .store
                    .update(self.animation_id, &mut |a| a.complete(output.clone()));
                if let Err(e) = completed {
                    self.mark_failed(format!("Animation rendering failed: {e}"));
                    return Err(e);
                }
                tracing::info!(output = %output, "render job completed");
                Ok(output)
            }
            Err(err) => {
                let message = if cancelled.is_cancelled()
                    || matches!(err.root_cause(), FightframeError::Cancelled(_))
                {
                    CANCELLED_MESSAGE.to_owned()
                } else {
                    format!("Animation rendering failed: {err}")
                };
                tracing::warn!(%message, "render job failed");
                self.mark_failed(message);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/render_job.rs"]
mod tests;
