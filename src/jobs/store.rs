//! Persistence collaborator for animation records.

use crate::foundation::error::{FightframeError, FightframeResult};
use crate::jobs::record::{Animation, NewAnimation};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Version conflicts tolerated by [`AnimationStore::update`] before giving up.
const UPDATE_RETRIES: usize = 8;

/// Durable storage for [`Animation`] records.
///
/// `save` is optimistic: it succeeds only when the stored version equals the record's version,
/// and the persisted copy carries the next version.
pub trait AnimationStore: Send + Sync {
    fn insert(&self, user_id: u64, new: NewAnimation) -> FightframeResult<Animation>;

    fn load(&self, id: u64) -> FightframeResult<Animation>;

    fn save(&self, record: &Animation) -> FightframeResult<Animation>;

    /// Records owned by `user_id`, newest first.
    fn list_by_user(&self, user_id: u64) -> FightframeResult<Vec<Animation>>;

    /// Load, mutate and save `id`, reloading on version conflicts.
    ///
    /// An error from `mutate` aborts without writing.
    fn update(
        &self,
        id: u64,
        mutate: &mut dyn FnMut(&mut Animation) -> FightframeResult<()>,
    ) -> FightframeResult<Animation> {
        for _ in 0..UPDATE_RETRIES {
            let mut record = self.load(id)?;
            mutate(&mut record)?;
            match self.save(&record) {
                Err(FightframeError::Conflict(msg)) => {
                    tracing::debug!(animation_id = id, %msg, "retrying conflicting update");
                }
                other => return other,
            }
        }
        Err(FightframeError::conflict(format!(
            "animation {id} kept changing during update"
        )))
    }
}

fn stale(record: &Animation, stored: u64) -> FightframeError {
    FightframeError::conflict(format!(
        "animation {} is at version {stored}, write was based on {}",
        record.id, record.version
    ))
}

fn newest_first(records: &mut [Animation]) {
    records.sort_by(|a, b| b.created_seq.cmp(&a.created_seq));
}

#[derive(Debug, Default)]
struct MemState {
    last_id: u64,
    records: BTreeMap<u64, Animation>,
}

/// Mutex-guarded in-process store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> FightframeResult<MutexGuard<'_, MemState>> {
        self.state
            .lock()
            .map_err(|_| FightframeError::storage("animation store lock poisoned"))
    }
}

impl AnimationStore for InMemoryStore {
    fn insert(&self, user_id: u64, new: NewAnimation) -> FightframeResult<Animation> {
        new.validate()?;
        let mut state = self.lock()?;
        state.last_id += 1;
        let id = state.last_id;
        let mut record = Animation::draft(id, user_id, id, new);
        record.version = 1;
        state.records.insert(id, record.clone());
        Ok(record)
    }

    fn load(&self, id: u64) -> FightframeResult<Animation> {
        self.lock()?
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| FightframeError::not_found(format!("animation {id}")))
    }

    fn save(&self, record: &Animation) -> FightframeResult<Animation> {
        let mut state = self.lock()?;
        let stored = state
            .records
            .get_mut(&record.id)
            .ok_or_else(|| FightframeError::not_found(format!("animation {}", record.id)))?;
        if stored.version != record.version {
            return Err(stale(record, stored.version));
        }
        let mut next = record.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    fn list_by_user(&self, user_id: u64) -> FightframeResult<Vec<Animation>> {
        let mut out: Vec<Animation> = self
            .lock()?
            .records
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut out);
        Ok(out)
    }
}

/// One pretty-printed JSON file per record: `<dir>/animation_<id>.json`.
///
/// A process-local mutex serializes writers; the store is not safe to share between processes.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(dir: impl Into<PathBuf>) -> FightframeResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            FightframeError::storage(format!("create store directory '{}': {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("animation_{id}.json"))
    }

    fn guard(&self) -> FightframeResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| FightframeError::storage("animation store lock poisoned"))
    }

    fn read_path(path: &Path) -> FightframeResult<Animation> {
        let bytes = std::fs::read(path)
            .map_err(|e| FightframeError::storage(format!("read '{}': {e}", path.display())))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            FightframeError::storage(format!("corrupt record '{}': {e}", path.display()))
        })
    }

    fn write_record(&self, record: &Animation) -> FightframeResult<()> {
        let path = self.record_path(record.id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(record)?;
        std::fs::write(&tmp, bytes)
            .map_err(|e| FightframeError::storage(format!("write '{}': {e}", tmp.display())))?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            FightframeError::storage(format!("replace '{}': {e}", path.display()))
        })
    }

    fn all_records(&self) -> FightframeResult<Vec<Animation>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            FightframeError::storage(format!("list '{}': {e}", self.dir.display()))
        })?;
        let mut out = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| FightframeError::storage(format!("list store entry: {e}")))?
                .path();
            let is_record = path.extension().is_some_and(|ext| ext == "json")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("animation_"));
            if is_record {
                out.push(Self::read_path(&path)?);
            }
        }
        Ok(out)
    }
}

impl AnimationStore for JsonFileStore {
    fn insert(&self, user_id: u64, new: NewAnimation) -> FightframeResult<Animation> {
        new.validate()?;
        let _guard = self.guard()?;
        let last = self
            .all_records()?
            .iter()
            .map(|a| a.id.max(a.created_seq))
            .max()
            .unwrap_or(0);
        let id = last + 1;
        let mut record = Animation::draft(id, user_id, id, new);
        record.version = 1;
        self.write_record(&record)?;
        Ok(record)
    }

    fn load(&self, id: u64) -> FightframeResult<Animation> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(FightframeError::not_found(format!("animation {id}")));
        }
        Self::read_path(&path)
    }

    fn save(&self, record: &Animation) -> FightframeResult<Animation> {
        let _guard = self.guard()?;
        let stored = self.load(record.id)?;
        if stored.version != record.version {
            return Err(stale(record, stored.version));
        }
        let mut next = record.clone();
        next.version += 1;
        self.write_record(&next)?;
        Ok(next)
    }

    fn list_by_user(&self, user_id: u64) -> FightframeResult<Vec<Animation>> {
        let mut out: Vec<Animation> = self
            .all_records()?
            .into_iter()
            .filter(|a| a.user_id == user_id)
            .collect();
        newest_first(&mut out);
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/store.rs"]
mod tests;
