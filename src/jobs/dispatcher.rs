//! Background job dispatcher: a fixed pool of worker threads fed by a bounded channel, plus a
//! task board that records state and progress per task.

use crate::config::JobOpts;
use crate::foundation::error::{FightframeError, FightframeResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, mpsc};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Reserved or queued, not picked up by a worker yet.
    Pending,
    /// Running on a worker.
    Progress,
    Success,
    Failure,
    /// Cancelled before or while running.
    Revoked,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Revoked)
    }
}

/// Snapshot of one task on the board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    /// 0..=100, never decreases.
    pub progress: u8,
    pub message: Option<String>,
    /// Value returned by a successful job.
    pub result: Option<String>,
}

impl TaskStatus {
    fn pending() -> Self {
        Self {
            state: TaskState::Pending,
            progress: 0,
            message: None,
            result: None,
        }
    }
}

/// Finished tasks kept on the board before the oldest are dropped.
pub const DEFAULT_RETAINED_FINISHED: usize = 1024;

/// What [`JobDispatcher::cancel`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The task never started and will not run.
    NotStarted,
    /// The running job was asked to stop; it observes the flag at its next progress report.
    Signalled,
    /// The task had already finished.
    AlreadyFinished,
}

/// Unit of background work.
pub trait Job: Send + 'static {
    /// Run to completion. `Ok` carries the task result shown by [`JobDispatcher::poll`].
    fn run(self: Box<Self>, ctx: JobContext) -> FightframeResult<String>;
}

struct TaskEntry {
    status: TaskStatus,
    cancel: Arc<AtomicBool>,
    submitted: bool,
}

#[derive(Default)]
struct TaskBoard {
    tasks: Mutex<HashMap<TaskId, TaskEntry>>,
    changed: Condvar,
}

impl TaskBoard {
    fn lock(&self) -> FightframeResult<MutexGuard<'_, HashMap<TaskId, TaskEntry>>> {
        self.tasks
            .lock()
            .map_err(|_| FightframeError::storage("task board lock poisoned"))
    }

    fn with_task<T>(
        &self,
        id: TaskId,
        f: impl FnOnce(&mut TaskEntry) -> T,
    ) -> FightframeResult<T> {
        let mut tasks = self.lock()?;
        let entry = tasks
            .get_mut(&id)
            .ok_or_else(|| FightframeError::not_found(format!("{id}")))?;
        let out = f(entry);
        drop(tasks);
        self.changed.notify_all();
        Ok(out)
    }
}

/// Drop the oldest finished entries until at most `keep` remain. Ids grow monotonically, so the
/// smallest ids are the oldest.
fn prune_finished(tasks: &mut HashMap<TaskId, TaskEntry>, keep: usize) -> usize {
    let mut finished: Vec<TaskId> = tasks
        .iter()
        .filter(|(_, t)| t.status.state.is_terminal())
        .map(|(id, _)| *id)
        .collect();
    if finished.len() <= keep {
        return 0;
    }
    finished.sort_unstable();
    let excess = finished.len() - keep;
    for id in &finished[..excess] {
        tasks.remove(id);
    }
    excess
}

/// Handle given to a running [`Job`].
#[derive(Clone)]
pub struct JobContext {
    id: TaskId,
    board: Arc<TaskBoard>,
    cancel: Arc<AtomicBool>,
}

impl fmt::Debug for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl JobContext {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Publish progress. Values below the current board progress keep the higher value.
    pub fn set_progress(&self, percent: u8, message: &str) -> FightframeResult<()> {
        let percent = percent.min(100);
        self.board.with_task(self.id, |t| {
            t.status.state = TaskState::Progress;
            t.status.progress = t.status.progress.max(percent);
            t.status.message = Some(message.to_owned());
        })
    }

    /// Replace the status message without touching progress.
    pub fn note(&self, message: &str) -> FightframeResult<()> {
        self.board.with_task(self.id, |t| {
            t.status.message = Some(message.to_owned());
        })
    }
}

struct Envelope {
    id: TaskId,
    job: Box<dyn Job>,
}

/// Fixed worker pool. Dropping the dispatcher closes the queue and joins every worker after the
/// queued jobs drain.
///
/// The board keeps at most `retain_finished` finished tasks; older ones are dropped when new
/// tasks are reserved and then poll as `NotFound`.
pub struct JobDispatcher {
    board: Arc<TaskBoard>,
    tx: Option<mpsc::SyncSender<Envelope>>,
    workers: Vec<JoinHandle<()>>,
    next_id: AtomicU64,
    retain_finished: usize,
}

impl fmt::Debug for JobDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDispatcher")
            .field("workers", &self.workers.len())
            .field("retain_finished", &self.retain_finished)
            .finish_non_exhaustive()
    }
}

impl JobDispatcher {
    /// Spawn `workers` threads sharing a queue of `capacity` jobs.
    pub fn new(workers: usize, capacity: usize) -> FightframeResult<Self> {
        if workers == 0 {
            return Err(FightframeError::validation("dispatcher needs at least one worker"));
        }
        if capacity == 0 {
            return Err(FightframeError::validation("dispatcher queue capacity must be >= 1"));
        }
        let board = Arc::new(TaskBoard::default());
        let (tx, rx) = mpsc::sync_channel::<Envelope>(capacity);
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let rx = Arc::clone(&rx);
            let board = Arc::clone(&board);
            let handle = std::thread::Builder::new()
                .name(format!("fightframe-job-{index}"))
                .spawn(move || worker_loop(&rx, &board))
                .map_err(|e| anyhow::anyhow!("spawn job worker {index}: {e}"))?;
            handles.push(handle);
        }
        tracing::debug!(workers, capacity, "job dispatcher started");

        Ok(Self {
            board,
            tx: Some(tx),
            workers: handles,
            next_id: AtomicU64::new(0),
            retain_finished: DEFAULT_RETAINED_FINISHED,
        })
    }

    /// Dispatcher sized and bounded by the `jobs` config section.
    pub fn from_opts(opts: &JobOpts) -> FightframeResult<Self> {
        Self::new(opts.workers, opts.channel_capacity)?.with_retention(opts.retain_finished)
    }

    /// Keep at most `finished` finished tasks on the board.
    pub fn with_retention(mut self, finished: usize) -> FightframeResult<Self> {
        if finished == 0 {
            return Err(FightframeError::validation(
                "dispatcher must retain at least one finished task",
            ));
        }
        self.retain_finished = finished;
        Ok(self)
    }

    /// Number of tasks currently on the board, live and finished.
    pub fn tracked(&self) -> FightframeResult<usize> {
        Ok(self.board.lock()?.len())
    }

    /// Allocate a task id in `Pending` state without queuing work yet.
    pub fn reserve(&self) -> FightframeResult<TaskId> {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let entry = TaskEntry {
            status: TaskStatus::pending(),
            cancel: Arc::new(AtomicBool::new(false)),
            submitted: false,
        };
        let mut tasks = self.board.lock()?;
        let pruned = prune_finished(&mut tasks, self.retain_finished);
        tasks.insert(id, entry);
        drop(tasks);
        if pruned > 0 {
            tracing::debug!(pruned, "dropped finished tasks from the board");
        }
        Ok(id)
    }

    /// Remove a finished task from the board. Returns `false` when it is already gone.
    pub fn forget(&self, id: TaskId) -> FightframeResult<bool> {
        let mut tasks = self.board.lock()?;
        match tasks.get(&id) {
            None => Ok(false),
            Some(t) if !t.status.state.is_terminal() => Err(FightframeError::conflict(format!(
                "{id} is {:?} and cannot be forgotten",
                t.status.state
            ))),
            Some(_) => {
                tasks.remove(&id);
                Ok(true)
            }
        }
    }

    pub fn submit(&self, job: Box<dyn Job>) -> FightframeResult<TaskId> {
        let id = self.reserve()?;
        self.submit_reserved(id, job)?;
        Ok(id)
    }

    /// Queue `job` under a previously reserved id. Blocks while the queue is full.
    pub fn submit_reserved(&self, id: TaskId, job: Box<dyn Job>) -> FightframeResult<()> {
        self.board.with_task(id, |t| {
            if t.submitted {
                return Err(FightframeError::conflict(format!("{id} already submitted")));
            }
            if t.status.state != TaskState::Pending {
                return Err(FightframeError::conflict(format!(
                    "{id} is {:?} and cannot be queued",
                    t.status.state
                )));
            }
            t.submitted = true;
            Ok(())
        })??;

        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| FightframeError::conflict("job dispatcher is shut down"))?;
        if tx.send(Envelope { id, job }).is_err() {
            self.board.with_task(id, |t| {
                t.status.state = TaskState::Failure;
                t.status.message = Some("job workers are not accepting work".to_owned());
            })?;
            return Err(FightframeError::conflict("job workers are not accepting work"));
        }
        tracing::debug!(task = %id, "job queued");
        Ok(())
    }

    pub fn poll(&self, id: TaskId) -> FightframeResult<TaskStatus> {
        self.board.with_task(id, |t| t.status.clone())
    }

    /// Request cancellation. A task that has not started is revoked immediately.
    pub fn cancel(&self, id: TaskId) -> FightframeResult<CancelOutcome> {
        self.board.with_task(id, |t| {
            if t.status.state.is_terminal() {
                return CancelOutcome::AlreadyFinished;
            }
            t.cancel.store(true, Ordering::Release);
            if t.status.state == TaskState::Pending {
                t.status.state = TaskState::Revoked;
                t.status.message = Some("cancelled before start".to_owned());
                CancelOutcome::NotStarted
            } else {
                CancelOutcome::Signalled
            }
        })
    }

    /// Block until `id` is terminal or `timeout` elapses; returns the latest status either way.
    pub fn wait(&self, id: TaskId, timeout: Duration) -> FightframeResult<TaskStatus> {
        let deadline = Instant::now() + timeout;
        let mut tasks = self.board.lock()?;
        loop {
            let status = tasks
                .get(&id)
                .map(|t| t.status.clone())
                .ok_or_else(|| FightframeError::not_found(format!("{id}")))?;
            let now = Instant::now();
            if status.state.is_terminal() || now >= deadline {
                return Ok(status);
            }
            let (guard, _) = self
                .board
                .changed
                .wait_timeout(tasks, deadline - now)
                .map_err(|_| FightframeError::storage("task board lock poisoned"))?;
            tasks = guard;
        }
    }
}

impl Drop for JobDispatcher {
    fn drop(&mut self) {
        drop(self.tx.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("job worker thread panicked");
            }
        }
    }
}

fn worker_loop(rx: &Mutex<mpsc::Receiver<Envelope>>, board: &Arc<TaskBoard>) {
    loop {
        let next = match rx.lock() {
            Ok(guard) => guard.recv(),
            Err(_) => break,
        };
        let Ok(envelope) = next else {
            break;
        };
        run_envelope(board, envelope);
    }
}

fn run_envelope(board: &Arc<TaskBoard>, Envelope { id, job }: Envelope) {
    let started = board.with_task(id, |t| {
        if t.status.state == TaskState::Revoked {
            None
        } else {
            t.status.state = TaskState::Progress;
            Some(Arc::clone(&t.cancel))
        }
    });
    let cancel = match started {
        Ok(Some(cancel)) => cancel,
        Ok(None) => {
            tracing::debug!(task = %id, "skipping revoked job");
            return;
        }
        Err(e) => {
            tracing::warn!(task = %id, error = %e, "dropping job without a board entry");
            return;
        }
    };

    let ctx = JobContext {
        id,
        board: Arc::clone(board),
        cancel: Arc::clone(&cancel),
    };
    let outcome = catch_unwind(AssertUnwindSafe(move || job.run(ctx))).unwrap_or_else(|_| {
        Err(FightframeError::Other(anyhow::anyhow!("job {id} panicked")))
    });

    let finished = board.with_task(id, |t| match outcome {
        Ok(result) => {
            t.status.state = TaskState::Success;
            t.status.progress = 100;
            t.status.result = Some(result);
        }
        Err(err) => {
            let revoked = cancel.load(Ordering::Acquire)
                || matches!(err.root_cause(), FightframeError::Cancelled(_));
            t.status.state = if revoked {
                TaskState::Revoked
            } else {
                TaskState::Failure
            };
            t.status.message = Some(err.to_string());
        }
    });
    if let Err(e) = finished {
        tracing::warn!(task = %id, error = %e, "could not record job outcome");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/dispatcher.rs"]
mod tests;
