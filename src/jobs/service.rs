//! Owner-facing animation operations: CRUD, render requests, status and listing.

use crate::config::JobOpts;
use crate::foundation::error::{FightframeError, FightframeResult};
use crate::jobs::dispatcher::{CancelOutcome, JobDispatcher, TaskId, TaskStatus};
use crate::jobs::record::{Animation, AnimationPatch, AnimationStatus, NewAnimation};
use crate::jobs::render_job::{CANCELLED_MESSAGE, RenderJob};
use crate::jobs::store::AnimationStore;
use crate::render::AnimationGenerator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_PER_PAGE: usize = 10;
pub const MAX_PER_PAGE: usize = 100;

/// One page of a listing. `pages` is 0 when there are no items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub pages: usize,
    pub current_page: usize,
}

/// Render state as seen by the owner: the record plus the live task, when one is known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderStatus {
    pub status: AnimationStatus,
    pub progress: u8,
    pub task: Option<TaskStatus>,
    pub output_path: Option<String>,
    pub error_message: Option<String>,
}

pub struct AnimationService {
    store: Arc<dyn AnimationStore>,
    dispatcher: Arc<JobDispatcher>,
    generator: Arc<AnimationGenerator>,
    jobs: JobOpts,
}

impl std::fmt::Debug for AnimationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationService")
            .field("jobs", &self.jobs)
            .finish_non_exhaustive()
    }
}

impl AnimationService {
    pub fn new(
        store: Arc<dyn AnimationStore>,
        dispatcher: Arc<JobDispatcher>,
        generator: Arc<AnimationGenerator>,
        jobs: JobOpts,
    ) -> FightframeResult<Self> {
        jobs.validate()?;
        Ok(Self {
            store,
            dispatcher,
            generator,
            jobs,
        })
    }

    pub fn create(&self, user_id: u64, new: NewAnimation) -> FightframeResult<Animation> {
        let rec = self.store.insert(user_id, new)?;
        tracing::info!(animation_id = rec.id, user_id, "animation created");
        Ok(rec)
    }

    pub fn get(&self, user_id: u64, id: u64) -> FightframeResult<Animation> {
        let rec = self.store.load(id)?;
        rec.ensure_owner(user_id)?;
        Ok(rec)
    }

    pub fn update(
        &self,
        user_id: u64,
        id: u64,
        patch: AnimationPatch,
    ) -> FightframeResult<Animation> {
        self.store.update(id, &mut |a| {
            a.ensure_owner(user_id)?;
            a.apply_patch(patch.clone())
        })
    }

    /// Move the animation to `Rendering` and queue its render job.
    ///
    /// The task id is persisted before the job is queued, so the job always finds its record in
    /// `Rendering`.
    #[tracing::instrument(skip(self))]
    pub fn request_render(&self, user_id: u64, id: u64) -> FightframeResult<TaskId> {
        self.get(user_id, id)?;
        let task = self.dispatcher.reserve()?;

        let rec = match self.store.update(id, &mut |a| {
            a.ensure_owner(user_id)?;
            a.begin_render(task)
        }) {
            Ok(rec) => rec,
            Err(e) => {
                let released = self
                    .dispatcher
                    .cancel(task)
                    .and_then(|_| self.dispatcher.forget(task));
                if let Err(revoke) = released {
                    tracing::warn!(%task, error = %revoke, "could not release reserved task");
                }
                return Err(e);
            }
        };

        let job = RenderJob {
            animation_id: id,
            scene: rec.scene_data,
            target: self.jobs.output_target(id),
            generator: Arc::clone(&self.generator),
            store: Arc::clone(&self.store),
        };
        if let Err(e) = self.dispatcher.submit_reserved(task, Box::new(job)) {
            let message = format!("could not queue render: {e}");
            self.store.update(id, &mut |a| a.fail(message.clone()))?;
            return Err(e);
        }
        tracing::info!(%task, "render queued");
        Ok(task)
    }

    pub fn render_status(&self, user_id: u64, id: u64) -> FightframeResult<RenderStatus> {
        let rec = self.get(user_id, id)?;
        let task = match rec.render_task_id {
            Some(task) => match self.dispatcher.poll(task) {
                Ok(status) => Some(status),
                Err(FightframeError::NotFound(_)) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };
        Ok(RenderStatus {
            status: rec.status,
            progress: rec.render_progress,
            task,
            output_path: rec.output_path,
            error_message: rec.error_message,
        })
    }

    /// Cancel an in-flight render. A queued job is revoked and the record fails immediately;
    /// a running job fails the record itself at its next progress report.
    pub fn cancel_render(&self, user_id: u64, id: u64) -> FightframeResult<Animation> {
        let rec = self.get(user_id, id)?;
        let task = match (rec.status, rec.render_task_id) {
            (AnimationStatus::Rendering, Some(task)) => task,
            _ => {
                return Err(FightframeError::conflict(format!(
                    "animation {id} is not rendering"
                )));
            }
        };
        match self.dispatcher.cancel(task)? {
            CancelOutcome::NotStarted => {
                tracing::info!(%task, "queued render revoked");
                self.store.update(id, &mut |a| a.fail(CANCELLED_MESSAGE))
            }
            CancelOutcome::Signalled | CancelOutcome::AlreadyFinished => self.store.load(id),
        }
    }

    /// Owner's animations, newest first. `page` is 1-based.
    pub fn list(&self, user_id: u64, page: usize, per_page: usize) -> FightframeResult<Page<Animation>> {
        if page == 0 {
            return Err(FightframeError::validation("page must be >= 1"));
        }
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(FightframeError::validation(format!(
                "per_page must be within 1..={MAX_PER_PAGE}"
            )));
        }
        let all = self.store.list_by_user(user_id)?;
        let total = all.len();
        let items = all
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .collect();
        Ok(Page {
            items,
            total,
            pages: total.div_ceil(per_page),
            current_page: page,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/service.rs"]
mod tests;
