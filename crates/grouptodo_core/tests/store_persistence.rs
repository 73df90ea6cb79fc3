use grouptodo_core::db::{open_db, open_db_in_memory};
use grouptodo_core::{
    Collection, MemorySlotRepository, SlotRepoError, SlotRepoResult, SlotRepository,
    SqliteSlotRepository, StoreError, TodoColor, TodoStore,
};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

const KEY: &str = "grouptodo.groups";

/// Slot that reads nothing and can be switched to reject writes.
struct FlakySlot {
    reject_writes: Rc<Cell<bool>>,
}

impl SlotRepository for FlakySlot {
    fn read_slot(&self, _key: &str) -> SlotRepoResult<Option<String>> {
        Ok(None)
    }

    fn write_slot(&self, _key: &str, _value: &str) -> SlotRepoResult<()> {
        if self.reject_writes.get() {
            return Err(SlotRepoError::Unavailable("quota exceeded".to_string()));
        }
        Ok(())
    }

    fn clear_slot(&self, _key: &str) -> SlotRepoResult<()> {
        if self.reject_writes.get() {
            return Err(SlotRepoError::Unavailable("storage locked".to_string()));
        }
        Ok(())
    }
}

#[test]
fn every_mutation_writes_full_snapshot() {
    let repo = MemorySlotRepository::new();
    let mut store = TodoStore::load(repo.clone(), KEY);

    let group_id = store.create_group("Home").unwrap();
    let todo_id = store.add_todo(&group_id, "dishes", TodoColor::Blue).unwrap();
    store.toggle_todo(&group_id, &todo_id).unwrap();

    let raw = repo.read_slot(KEY).unwrap().expect("snapshot written");
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value[0]["title"], "Home");
    assert_eq!(value[0]["todos"][0]["text"], "dishes");
    assert_eq!(value[0]["todos"][0]["completed"], true);
    assert_eq!(value[0]["todos"][0]["color"], "blue");
}

#[test]
fn sqlite_round_trip_restores_equal_collection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.sqlite3");

    let saved: Arc<Collection> = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteSlotRepository::try_new(&conn).unwrap();
        let mut store = TodoStore::load(repo, KEY);
        let home = store.create_group("Home").unwrap();
        let work = store.create_group("Work").unwrap();
        let a = store.add_todo(&home, "a", TodoColor::Red).unwrap();
        store.add_todo(&home, "b", TodoColor::Default).unwrap();
        store.add_todo(&work, "x", TodoColor::Yellow).unwrap();
        store.toggle_todo(&home, &a).unwrap();
        store.move_todo(&home, &work, 1, 0).unwrap();
        store.snapshot()
    };

    let conn = open_db(&path).unwrap();
    let repo = SqliteSlotRepository::try_new(&conn).unwrap();
    let reloaded = TodoStore::load(repo, KEY);

    assert_eq!(*reloaded.snapshot(), *saved);
    assert_eq!(reloaded.snapshot().todo_count(), 3);
}

#[test]
fn absent_slot_starts_empty_without_writing() {
    let repo = MemorySlotRepository::new();
    let store = TodoStore::load(repo.clone(), KEY);

    assert!(store.snapshot().is_empty());
    assert!(repo.is_empty());
}

#[test]
fn corrupted_slot_falls_back_to_empty() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSlotRepository::try_new(&conn).unwrap();
    repo.write_slot(KEY, "{\"groups\": [oops").unwrap();

    let mut store = TodoStore::load(repo, KEY);
    assert!(store.snapshot().is_empty());

    // The next mutation overwrites the discarded payload.
    store.create_group("fresh").unwrap();
    let raw = SqliteSlotRepository::try_new(&conn)
        .unwrap()
        .read_slot(KEY)
        .unwrap()
        .unwrap();
    assert!(raw.starts_with('['));
}

#[test]
fn shape_mismatch_is_tolerated() {
    let repo = MemorySlotRepository::new();
    repo.write_slot(
        KEY,
        r#"[{"id":"group-1","title":"Legacy","createdAt":1700000000000.25,"todos":[
            {"id":"todo-1","text":"old","color":"magenta"},
            {"id":"todo-2","text":null,"completed":null,"createdAt":1.5},
            {"id":"9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d","text":"kept","completed":true}
        ]},
        {"title":null,"todos":"none"}]"#,
    )
    .unwrap();

    let mut store = TodoStore::load(repo.clone(), KEY);
    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.todo_count(), 3);

    let legacy = snapshot.group("group-1").expect("foreign group id is kept");
    assert_eq!(legacy.title, "Legacy");
    assert_eq!(legacy.created_at, 1_700_000_000_000);
    let old = legacy.todo("todo-1").unwrap();
    assert_eq!(old.text, "old");
    assert_eq!(old.color, TodoColor::Default);
    assert!(!old.completed);
    let blank = legacy.todo("todo-2").unwrap();
    assert_eq!(blank.text, "");
    assert!(!blank.completed);
    assert_eq!(blank.created_at, 1);
    assert!(legacy.todo("9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d").unwrap().completed);

    let untitled = &snapshot.groups()[1];
    assert!(!untitled.id.is_empty());
    assert_eq!(untitled.title, "");
    assert!(untitled.todos.is_empty());

    // Foreign ids stay addressable, and the next write keeps every entry.
    store.toggle_todo("group-1", "todo-2").unwrap();
    let reloaded = TodoStore::load(repo, KEY);
    assert_eq!(*reloaded.snapshot(), *store.snapshot());
    assert!(reloaded.snapshot().todo("group-1", "todo-2").unwrap().completed);
}

#[test]
fn slots_are_isolated_by_key() {
    let repo = MemorySlotRepository::new();
    let mut home = TodoStore::load(repo.clone(), "home");
    home.create_group("Home").unwrap();

    let work = TodoStore::load(repo.clone(), "work");
    assert!(work.snapshot().is_empty());
    assert_eq!(work.slot_key(), "work");
    assert_eq!(repo.len(), 1);
}

#[test]
fn failed_write_keeps_state_and_notifies() {
    let reject = Rc::new(Cell::new(false));
    let mut store = TodoStore::load(
        FlakySlot {
            reject_writes: Rc::clone(&reject),
        },
        KEY,
    );
    let group_id = store.create_group("G").unwrap();

    let notified = Rc::new(Cell::new(0));
    let counter = Rc::clone(&notified);
    store.subscribe(move |_: &Arc<Collection>| counter.set(counter.get() + 1));

    reject.set(true);
    let err = store.rename_group(&group_id, "renamed").unwrap_err();
    assert!(matches!(
        err,
        StoreError::Persist(SlotRepoError::Unavailable(_))
    ));
    assert!(!err.is_noop());
    assert_eq!(store.snapshot().group(&group_id).unwrap().title, "renamed");
    assert_eq!(notified.get(), 1);

    reject.set(false);
    store.rename_group(&group_id, "again").unwrap();
    assert_eq!(notified.get(), 2);

    reject.set(true);
    let err = store.clear().unwrap_err();
    assert!(matches!(err, StoreError::Persist(_)));
    assert!(store.snapshot().is_empty());
    assert_eq!(notified.get(), 3);
}

#[test]
fn reload_picks_up_external_write() {
    let repo = MemorySlotRepository::new();
    let mut store = TodoStore::load(repo.clone(), KEY);
    assert!(store.snapshot().is_empty());

    let mut other = TodoStore::load(repo.clone(), KEY);
    other.create_group("from elsewhere").unwrap();

    let reloaded = store.reload();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.groups()[0].title, "from elsewhere");
}
