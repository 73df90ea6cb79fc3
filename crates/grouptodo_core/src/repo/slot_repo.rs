//! Durable key-value slot contracts and implementations.
//!
//! # Responsibility
//! - Read and overwrite one named text value per key.
//! - Keep SQL details inside the repository boundary.
//!
//! # Invariants
//! - `write_slot` replaces the whole value; there are no partial writes.
//! - Reading a key that was never written returns `Ok(None)`.
//! - Slot values are opaque text; logs carry key and size, never content.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::now_epoch_ms;
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

const SLOT_TABLE: &str = "kv_slots";

/// Result type used by slot repository operations.
pub type SlotRepoResult<T> = Result<T, SlotRepoError>;

/// Errors from slot repository operations.
#[derive(Debug)]
pub enum SlotRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Backing store cannot serve the request right now.
    Unavailable(String),
}

impl Display for SlotRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "slot repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "slot repository requires table `{table}`")
            }
            Self::Unavailable(message) => write!(f, "slot storage unavailable: {message}"),
        }
    }
}

impl Error for SlotRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SlotRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SlotRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable key-value slot contract.
pub trait SlotRepository {
    /// Loads the value stored under `key`, if any.
    fn read_slot(&self, key: &str) -> SlotRepoResult<Option<String>>;
    /// Overwrites the value stored under `key`.
    fn write_slot(&self, key: &str, value: &str) -> SlotRepoResult<()>;
    /// Removes `key`. Removing a missing key is not an error.
    fn clear_slot(&self, key: &str) -> SlotRepoResult<()>;
}

/// SQLite-backed slot repository over table `kv_slots`.
pub struct SqliteSlotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSlotRepository<'conn> {
    /// Creates repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` when `kv_slots` was dropped.
    pub fn try_new(conn: &'conn Connection) -> SlotRepoResult<Self> {
        ensure_slot_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SlotRepository for SqliteSlotRepository<'_> {
    fn read_slot(&self, key: &str) -> SlotRepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT slot_value FROM kv_slots WHERE slot_key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        debug!(
            "event=slot_read module=repo status=ok key={key} found={} bytes={}",
            value.is_some(),
            value.as_ref().map_or(0, String::len)
        );
        Ok(value)
    }

    fn write_slot(&self, key: &str, value: &str) -> SlotRepoResult<()> {
        let result = self.conn.execute(
            "INSERT INTO kv_slots (slot_key, slot_value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(slot_key) DO UPDATE SET
                slot_value = excluded.slot_value,
                updated_at = excluded.updated_at;",
            params![key, value, now_epoch_ms()],
        );
        match result {
            Ok(_) => {
                debug!(
                    "event=slot_write module=repo status=ok key={key} bytes={}",
                    value.len()
                );
                Ok(())
            }
            Err(err) => {
                error!("event=slot_write module=repo status=error key={key} error={err}");
                Err(err.into())
            }
        }
    }

    fn clear_slot(&self, key: &str) -> SlotRepoResult<()> {
        self.conn
            .execute("DELETE FROM kv_slots WHERE slot_key = ?1;", [key])?;
        debug!("event=slot_clear module=repo status=ok key={key}");
        Ok(())
    }
}

/// Process-local slot repository.
///
/// Clones share the same map, so a store rebuilt from a clone sees what the
/// previous store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySlotRepository {
    slots: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemorySlotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }
}

impl SlotRepository for MemorySlotRepository {
    fn read_slot(&self, key: &str) -> SlotRepoResult<Option<String>> {
        let slots = self
            .slots
            .try_borrow()
            .map_err(|err| SlotRepoError::Unavailable(err.to_string()))?;
        Ok(slots.get(key).cloned())
    }

    fn write_slot(&self, key: &str, value: &str) -> SlotRepoResult<()> {
        let mut slots = self
            .slots
            .try_borrow_mut()
            .map_err(|err| SlotRepoError::Unavailable(err.to_string()))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear_slot(&self, key: &str) -> SlotRepoResult<()> {
        let mut slots = self
            .slots
            .try_borrow_mut()
            .map_err(|err| SlotRepoError::Unavailable(err.to_string()))?;
        slots.remove(key);
        Ok(())
    }
}

fn ensure_slot_connection_ready(conn: &Connection) -> SlotRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(SlotRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [SLOT_TABLE],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(SlotRepoError::MissingRequiredTable(SLOT_TABLE));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{MemorySlotRepository, SlotRepository};

    #[test]
    fn memory_clones_share_storage() {
        let repo = MemorySlotRepository::new();
        let other = repo.clone();

        repo.write_slot("k", "v1").unwrap();
        assert_eq!(other.read_slot("k").unwrap().as_deref(), Some("v1"));

        other.clear_slot("k").unwrap();
        assert!(repo.read_slot("k").unwrap().is_none());
        assert!(repo.is_empty());
    }
}
