//! Animation records, their persistence, and background render jobs.

pub mod dispatcher;
pub mod record;
pub mod render_job;
pub mod service;
pub mod store;

pub use dispatcher::{CancelOutcome, Job, JobContext, JobDispatcher, TaskId, TaskState, TaskStatus};
pub use record::{Animation, AnimationPatch, AnimationStatus, NewAnimation};
pub use render_job::{JobReporter, RenderJob};
pub use service::{AnimationService, Page, RenderStatus};
pub use store::{AnimationStore, InMemoryStore, JsonFileStore};
