use super::*;
use crate::foundation::core::Canvas;
use crate::jobs::dispatcher::{JobDispatcher, TaskId, TaskState};
use crate::jobs::record::{Animation, AnimationStatus, NewAnimation};
use crate::jobs::store::InMemoryStore;
use crate::render::{FrameRGBA, KeyframeModel, RenderOpts};
use serde_json::json;
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(20);

/// Rejects writes that would persist progress at or above `limit`.
struct FlakyStore {
    inner: InMemoryStore,
    limit: u8,
}

impl AnimationStore for FlakyStore {
    fn insert(&self, user_id: u64, new: NewAnimation) -> FightframeResult<Animation> {
        self.inner.insert(user_id, new)
    }

    fn load(&self, id: u64) -> FightframeResult<Animation> {
        self.inner.load(id)
    }

    fn save(&self, record: &Animation) -> FightframeResult<Animation> {
        if record.render_progress >= self.limit {
            return Err(FightframeError::storage("database unavailable"));
        }
        self.inner.save(record)
    }

    fn list_by_user(&self, user_id: u64) -> FightframeResult<Vec<Animation>> {
        self.inner.list_by_user(user_id)
    }
}

/// Two solid keyframes, produced only after the test releases the model.
struct GatedModel {
    started: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl KeyframeModel for GatedModel {
    fn generate(&self, _description: &str, canvas: Canvas) -> FightframeResult<Vec<FrameRGBA>> {
        if let Ok(tx) = self.started.lock() {
            let _ = tx.send(());
        }
        if let Ok(rx) = self.release.lock() {
            let _ = rx.recv_timeout(WAIT);
        }
        Ok(vec![
            FrameRGBA::solid(canvas, [0, 0, 0]),
            FrameRGBA::solid(canvas, [255, 255, 255]),
        ])
    }
}

fn opts() -> RenderOpts {
    RenderOpts {
        canvas: Canvas::new(8, 8).unwrap(),
        ..RenderOpts::default()
    }
}

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join("test-output")
        .join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn start(store: &Arc<dyn AnimationStore>, d: &JobDispatcher, description: &str) -> (u64, TaskId) {
    let scene = SceneData::from_value(json!({ "description": description, "fps": 4 })).unwrap();
    let rec = store
        .insert(
            1,
            NewAnimation {
                title: "test".to_owned(),
                scene_data: scene,
                ..NewAnimation::default()
            },
        )
        .unwrap();
    let task = d.reserve().unwrap();
    store
        .update(rec.id, &mut |a| a.begin_render(task))
        .unwrap();
    (rec.id, task)
}

fn job(
    store: &Arc<dyn AnimationStore>,
    generator: AnimationGenerator,
    id: u64,
    target: PathBuf,
) -> Box<RenderJob> {
    let scene = store.load(id).unwrap().scene_data;
    Box::new(RenderJob {
        animation_id: id,
        scene,
        target,
        generator: Arc::new(generator),
        store: Arc::clone(store),
    })
}

#[test]
fn completed_render_records_output() {
    let store: Arc<dyn AnimationStore> = Arc::new(InMemoryStore::new());
    let d = JobDispatcher::new(1, 2).unwrap();
    let (id, task) = start(&store, &d, "swords clash");
    let target = scratch("completed_render_records_output");

    let generator = AnimationGenerator::procedural(opts()).unwrap();
    d.submit_reserved(task, job(&store, generator, id, target.clone()))
        .unwrap();

    let status = d.wait(task, WAIT).unwrap();
    assert_eq!(status.state, TaskState::Success);
    let rec = store.load(id).unwrap();
    assert_eq!(rec.status, AnimationStatus::Completed);
    assert_eq!(rec.render_progress, 100);
    assert_eq!(
        rec.output_path.as_deref(),
        Some(target.display().to_string().as_str())
    );
    assert_eq!(status.result, rec.output_path);
    assert!(target.join("frame_00000.png").exists());
}

#[test]
fn pipeline_failure_marks_record_failed() {
    let store: Arc<dyn AnimationStore> = Arc::new(InMemoryStore::new());
    let d = JobDispatcher::new(1, 2).unwrap();
    let (id, task) = start(&store, &d, "duel");

    let generator = AnimationGenerator::procedural(opts()).unwrap();
    let target = scratch("pipeline_failure_marks_record_failed");
    d.submit_reserved(task, job(&store, generator, id, target))
        .unwrap();

    let status = d.wait(task, WAIT).unwrap();
    assert_eq!(status.state, TaskState::Failure);
    assert_eq!(status.progress, 50);
    assert!(status.message.unwrap().contains("frame interpolation"));

    let rec = store.load(id).unwrap();
    assert_eq!(rec.status, AnimationStatus::Failed);
    assert_eq!(rec.render_progress, 50);
    assert!(
        rec.error_message
            .unwrap()
            .contains("render error during frame interpolation")
    );
}

#[test]
fn progress_write_failure_fails_the_job() {
    let store: Arc<dyn AnimationStore> = Arc::new(FlakyStore {
        inner: InMemoryStore::new(),
        limit: 75,
    });
    let d = JobDispatcher::new(1, 2).unwrap();
    let (id, task) = start(&store, &d, "swords clash");

    let generator = AnimationGenerator::procedural(opts()).unwrap();
    let target = scratch("progress_write_failure_fails_the_job");
    d.submit_reserved(task, job(&store, generator, id, target.clone()))
        .unwrap();

    let status = d.wait(task, WAIT).unwrap();
    assert_eq!(status.state, TaskState::Failure);
    assert_eq!(status.progress, 50);

    let rec = store.load(id).unwrap();
    assert_eq!(rec.status, AnimationStatus::Failed);
    assert_eq!(rec.render_progress, 50);
    assert!(rec.error_message.unwrap().contains("database unavailable"));
    assert!(!target.exists());
}

#[test]
fn cancellation_is_observed_at_the_next_report() {
    let store: Arc<dyn AnimationStore> = Arc::new(InMemoryStore::new());
    let d = JobDispatcher::new(1, 2).unwrap();
    let (id, task) = start(&store, &d, "swords clash");

    let (started_tx, started_rx) = channel();
    let (release_tx, release_rx) = channel();
    let model = GatedModel {
        started: Mutex::new(started_tx),
        release: Mutex::new(release_rx),
    };
    let generator = AnimationGenerator::new(Arc::new(model), opts()).unwrap();
    let target = scratch("cancellation_is_observed_at_the_next_report");
    d.submit_reserved(task, job(&store, generator, id, target))
        .unwrap();

    started_rx.recv_timeout(WAIT).unwrap();
    d.cancel(task).unwrap();
    release_tx.send(()).unwrap();

    let status = d.wait(task, WAIT).unwrap();
    assert_eq!(status.state, TaskState::Revoked);
    let rec = store.load(id).unwrap();
    assert_eq!(rec.status, AnimationStatus::Failed);
    assert_eq!(rec.error_message.as_deref(), Some(CANCELLED_MESSAGE));
    assert_eq!(rec.render_progress, 25);
}
