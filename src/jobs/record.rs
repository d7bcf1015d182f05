//! Persisted animation record and its render lifecycle.

use crate::foundation::error::{FightframeError, FightframeResult};
use crate::jobs::dispatcher::TaskId;
use crate::render::SceneData;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Lifecycle state of an [`Animation`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationStatus {
    #[default]
    Draft,
    Rendering,
    Completed,
    Failed,
}

impl AnimationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Rendering => "rendering",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// `true` once a render has finished, successfully or not.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for AnimationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields supplied when an animation is created.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAnimation {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub scene_data: SceneData,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl NewAnimation {
    pub fn validate(&self) -> FightframeResult<()> {
        if self.title.trim().is_empty() {
            return Err(FightframeError::validation("animation title is required"));
        }
        Ok(())
    }
}

/// Partial owner update. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub scene_data: Option<SceneData>,
    pub settings: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub description: Option<String>,
    pub scene_data: SceneData,
    pub settings: Map<String, Value>,
    pub status: AnimationStatus,
    pub render_task_id: Option<TaskId>,
    /// Last persisted render progress, 0..=100.
    pub render_progress: u8,
    pub output_path: Option<String>,
    pub error_message: Option<String>,
    /// Optimistic concurrency token, bumped by every successful save.
    pub version: u64,
    /// Insertion order; larger is newer.
    pub created_seq: u64,
}

impl Animation {
    /// Fresh draft record. The store assigns `id`, `version` and `created_seq`.
    pub fn draft(id: u64, user_id: u64, created_seq: u64, new: NewAnimation) -> Self {
        Self {
            id,
            user_id,
            title: new.title.trim().to_owned(),
            description: new.description,
            scene_data: new.scene_data,
            settings: new.settings,
            status: AnimationStatus::Draft,
            render_task_id: None,
            render_progress: 0,
            output_path: None,
            error_message: None,
            version: 0,
            created_seq,
        }
    }

    pub fn ensure_owner(&self, user_id: u64) -> FightframeResult<()> {
        if self.user_id != user_id {
            return Err(FightframeError::forbidden(format!(
                "animation {} belongs to another user",
                self.id
            )));
        }
        Ok(())
    }

    /// Enter `Rendering` under `task_id`.
    ///
    /// Finished records re-enter directly, dropping the previous output and error.
    pub fn begin_render(&mut self, task_id: TaskId) -> FightframeResult<()> {
        if self.status == AnimationStatus::Rendering {
            return Err(FightframeError::conflict(format!(
                "animation {} is already rendering",
                self.id
            )));
        }
        self.status = AnimationStatus::Rendering;
        self.render_task_id = Some(task_id);
        self.render_progress = 0;
        self.output_path = None;
        self.error_message = None;
        Ok(())
    }

    /// Persist render progress. Lower values than the stored one are ignored.
    pub fn record_progress(&mut self, percent: u8) -> FightframeResult<()> {
        self.ensure_rendering("record progress")?;
        if percent > 100 {
            return Err(FightframeError::validation(format!(
                "progress must be <= 100, got {percent}"
            )));
        }
        self.render_progress = self.render_progress.max(percent);
        Ok(())
    }

    pub fn complete(&mut self, output_path: impl Into<String>) -> FightframeResult<()> {
        self.ensure_rendering("complete")?;
        self.status = AnimationStatus::Completed;
        self.render_progress = 100;
        self.output_path = Some(output_path.into());
        self.error_message = None;
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> FightframeResult<()> {
        self.ensure_rendering("fail")?;
        let message = message.into();
        self.status = AnimationStatus::Failed;
        self.error_message = Some(if message.trim().is_empty() {
            "render failed".to_owned()
        } else {
            message
        });
        Ok(())
    }

    /// Apply an owner edit. Scene data is frozen while a render is in flight.
    pub fn apply_patch(&mut self, patch: AnimationPatch) -> FightframeResult<()> {
        if let Some(title) = &patch.title
            && title.trim().is_empty()
        {
            return Err(FightframeError::validation("animation title is required"));
        }
        if patch.scene_data.is_some() && self.status == AnimationStatus::Rendering {
            return Err(FightframeError::conflict(format!(
                "animation {} scene cannot change while rendering",
                self.id
            )));
        }
        if let Some(title) = patch.title {
            self.title = title.trim().to_owned();
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(scene) = patch.scene_data {
            self.scene_data = scene;
        }
        if let Some(settings) = patch.settings {
            self.settings = settings;
        }
        Ok(())
    }

    fn ensure_rendering(&self, action: &str) -> FightframeResult<()> {
        if self.status != AnimationStatus::Rendering {
            return Err(FightframeError::conflict(format!(
                "cannot {action} animation {} in state {}",
                self.id, self.status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/record.rs"]
mod tests;
