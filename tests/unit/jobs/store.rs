use super::*;
use crate::jobs::dispatcher::TaskId;
use crate::jobs::record::AnimationStatus;

fn new(title: &str) -> NewAnimation {
    NewAnimation {
        title: title.to_owned(),
        ..NewAnimation::default()
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join("test-output")
        .join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn exercise(store: &dyn AnimationStore) {
    let a = store.insert(1, new("first")).unwrap();
    let b = store.insert(1, new("second")).unwrap();
    let c = store.insert(2, new("other")).unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(a.version, 1);

    let listed: Vec<u64> = store.list_by_user(1).unwrap().iter().map(|r| r.id).collect();
    assert_eq!(listed, vec![b.id, a.id]);
    assert_eq!(store.list_by_user(2).unwrap()[0].id, c.id);

    let mut edit = store.load(a.id).unwrap();
    edit.title = "renamed".to_owned();
    let saved = store.save(&edit).unwrap();
    assert_eq!(saved.version, 2);
    assert_eq!(store.load(a.id).unwrap().title, "renamed");

    let err = store.save(&edit).unwrap_err();
    assert!(matches!(err, FightframeError::Conflict(_)));

    let updated = store
        .update(a.id, &mut |r| r.begin_render(TaskId(9)))
        .unwrap();
    assert_eq!(updated.status, AnimationStatus::Rendering);
    assert_eq!(updated.version, 3);

    let err = store
        .update(a.id, &mut |r| r.begin_render(TaskId(10)))
        .unwrap_err();
    assert!(matches!(err, FightframeError::Conflict(_)));
    assert_eq!(store.load(a.id).unwrap().version, 3);

    assert!(matches!(
        store.load(999).unwrap_err(),
        FightframeError::NotFound(_)
    ));
    assert!(store.insert(1, new("   ")).unwrap_err().is_validation());
}

#[test]
fn in_memory_store_contract() {
    exercise(&InMemoryStore::new());
}

#[test]
fn json_file_store_contract() {
    let dir = scratch_dir("json_file_store_contract");
    let store = JsonFileStore::open(&dir).unwrap();
    exercise(&store);
    assert!(dir.join("animation_1.json").exists());

    let reopened = JsonFileStore::open(&dir).unwrap();
    assert_eq!(reopened.load(1).unwrap().title, "renamed");
    assert_eq!(reopened.insert(3, new("later")).unwrap().id, 4);
}

#[test]
fn update_retries_after_a_concurrent_write() {
    let store = InMemoryStore::new();
    let id = store.insert(1, new("race")).unwrap().id;
    let mut raced = false;
    let out = store
        .update(id, &mut |r| {
            if !raced {
                raced = true;
                let mut other = store.load(id)?;
                other.description = Some("from elsewhere".to_owned());
                store.save(&other)?;
            }
            r.title = "mine".to_owned();
            Ok(())
        })
        .unwrap();
    assert_eq!(out.title, "mine");
    assert_eq!(out.description.as_deref(), Some("from elsewhere"));
    assert_eq!(out.version, 3);
}
