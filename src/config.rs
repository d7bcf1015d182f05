//! Engine configuration loaded from JSON with environment overrides.

use crate::choreography::{ChoreographyOpts, PhysicsSettings};
use crate::foundation::error::{FightframeError, FightframeResult};
use crate::jobs::dispatcher::DEFAULT_RETAINED_FINISHED;
use crate::render::RenderOpts;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const ENV_OUTPUT_DIR: &str = "FIGHTFRAME_OUTPUT_DIR";
pub const ENV_WORKERS: &str = "FIGHTFRAME_WORKERS";

/// Container written by render jobs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// `<output_dir>/<animation id>.mp4` through ffmpeg.
    #[default]
    Mp4,
    /// `<output_dir>/<animation id>/frame_00000.png` ...
    Png,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOpts {
    /// Worker threads running render jobs.
    pub workers: usize,
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,
    /// Queued jobs before `submit` blocks.
    pub channel_capacity: usize,
    /// Finished tasks kept for status polling.
    pub retain_finished: usize,
}

impl Default for JobOpts {
    fn default() -> Self {
        Self {
            workers: 2,
            output_dir: PathBuf::from("outputs"),
            output_format: OutputFormat::Mp4,
            channel_capacity: 64,
            retain_finished: DEFAULT_RETAINED_FINISHED,
        }
    }
}

impl JobOpts {
    pub fn validate(&self) -> FightframeResult<()> {
        if self.workers == 0 {
            return Err(FightframeError::validation("jobs.workers must be >= 1"));
        }
        if self.channel_capacity == 0 {
            return Err(FightframeError::validation(
                "jobs.channel_capacity must be >= 1",
            ));
        }
        if self.retain_finished == 0 {
            return Err(FightframeError::validation(
                "jobs.retain_finished must be >= 1",
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(FightframeError::validation("jobs.output_dir must be set"));
        }
        Ok(())
    }

    /// Output target for an animation.
    pub fn output_target(&self, animation_id: u64) -> PathBuf {
        match self.output_format {
            OutputFormat::Mp4 => self.output_dir.join(format!("animation_{animation_id}.mp4")),
            OutputFormat::Png => self.output_dir.join(format!("animation_{animation_id}")),
        }
    }
}

/// Top-level configuration. Every section and field is optional in JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub physics: PhysicsSettings,
    pub choreography: ChoreographyOpts,
    pub render: RenderOpts,
    pub jobs: JobOpts,
}

impl EngineConfig {
    pub fn from_reader<R: std::io::Read>(r: R) -> FightframeResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| FightframeError::validation(format!("parse engine config JSON: {e}")))
    }

    pub fn from_json_str(json: &str) -> FightframeResult<Self> {
        Self::from_reader(json.as_bytes())
    }

    pub fn from_path(path: impl AsRef<Path>) -> FightframeResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            FightframeError::validation(format!("open engine config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn validate(&self) -> FightframeResult<()> {
        self.physics.validate()?;
        self.choreography.validate()?;
        self.render.validate()?;
        self.jobs.validate()
    }

    /// Apply `FIGHTFRAME_OUTPUT_DIR` and `FIGHTFRAME_WORKERS` from the process environment.
    pub fn apply_env(&mut self) -> FightframeResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub(crate) fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> FightframeResult<()> {
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|d| !d.trim().is_empty()) {
            self.jobs.output_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_WORKERS) {
            self.jobs.workers = raw.trim().parse().map_err(|_| {
                FightframeError::validation(format!("{ENV_WORKERS} must be a positive integer, got '{raw}'"))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
