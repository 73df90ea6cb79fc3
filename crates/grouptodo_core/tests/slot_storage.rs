use grouptodo_core::db::migrations::{current_user_version, latest_version};
use grouptodo_core::db::{open_db, open_db_in_memory, DbError};
use grouptodo_core::{SlotRepoError, SlotRepository, SqliteSlotRepository};
use rusqlite::Connection;

#[test]
fn migrations_create_kv_slots_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'kv_slots'
            );",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1);
}

#[test]
fn reopening_file_is_idempotent_and_keeps_slots() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slots.sqlite3");

    {
        let conn = open_db(&path).unwrap();
        let repo = SqliteSlotRepository::try_new(&conn).unwrap();
        repo.write_slot("groups", "[]").unwrap();
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    let repo = SqliteSlotRepository::try_new(&conn).unwrap();
    assert_eq!(repo.read_slot("groups").unwrap().as_deref(), Some("[]"));
}

#[test]
fn write_overwrites_whole_value() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSlotRepository::try_new(&conn).unwrap();

    repo.write_slot("groups", "first").unwrap();
    repo.write_slot("groups", "second").unwrap();

    assert_eq!(repo.read_slot("groups").unwrap().as_deref(), Some("second"));
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM kv_slots;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn missing_key_reads_none_and_clear_is_tolerant() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSlotRepository::try_new(&conn).unwrap();

    assert!(repo.read_slot("absent").unwrap().is_none());
    repo.clear_slot("absent").unwrap();

    repo.write_slot("present", "value").unwrap();
    repo.clear_slot("present").unwrap();
    assert!(repo.read_slot("present").unwrap().is_none());
}

#[test]
fn keys_are_independent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSlotRepository::try_new(&conn).unwrap();

    repo.write_slot("home", "a").unwrap();
    repo.write_slot("work", "b").unwrap();

    assert_eq!(repo.read_slot("home").unwrap().as_deref(), Some("a"));
    assert_eq!(repo.read_slot("work").unwrap().as_deref(), Some("b"));
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteSlotRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        SlotRepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn try_new_rejects_dropped_table() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE kv_slots;").unwrap();

    let err = SqliteSlotRepository::try_new(&conn).err().unwrap();
    assert!(matches!(err, SlotRepoError::MissingRequiredTable("kv_slots")));
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version() + 1))
            .unwrap();
    }

    let err = open_db(&path).unwrap_err();
    assert!(matches!(
        err,
        DbError::SchemaTooNew { found, supported } if found == supported + 1
    ));
    assert!(err.to_string().contains("reads up to"));
}
