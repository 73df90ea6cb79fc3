//! Collection store: single writer over the group/todo collection.
//!
//! # Responsibility
//! - Load the initial collection from the durable slot.
//! - Apply mutations as whole-value replacements of the current snapshot.
//! - Persist the full snapshot and notify subscribers after each change.
//!
//! # Invariants
//! - Only `TodoStore` methods replace the current snapshot; readers get
//!   `Arc<Collection>` values that never change after being handed out.
//! - A mutation that fails validation changes nothing: no write, no notify.
//! - A failed snapshot write keeps the applied in-memory state.
//! - An unreadable slot, or text that is not a JSON array, yields an empty
//!   collection at load time. Mistyped fields inside the array do not.

use crate::model::collection::{Collection, CollectionError};
use crate::model::group::{Group, GroupId};
use crate::model::todo::{Todo, TodoColor, TodoId};
use crate::repo::slot_repo::{SlotRepoError, SlotRepository};
use crate::snapshot::{self, SnapshotError};
use log::{debug, error, info};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Slot key used when the caller does not configure one.
pub const DEFAULT_SLOT_KEY: &str = "grouptodo.groups";

/// Result type used by store mutations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from store mutations.
#[derive(Debug)]
pub enum StoreError {
    /// Referenced group does not exist. State unchanged.
    GroupNotFound(GroupId),
    /// Referenced todo does not exist in the group. State unchanged.
    TodoNotFound { group_id: GroupId, todo_id: TodoId },
    /// Move index outside the group's valid range. State unchanged.
    IndexOutOfRange {
        group_id: GroupId,
        index: usize,
        len: usize,
    },
    /// Snapshot could not be serialized. In-memory state was applied.
    Encode(SnapshotError),
    /// Snapshot could not be written to the slot. In-memory state was applied.
    Persist(SlotRepoError),
}

impl StoreError {
    /// Whether the call left state untouched (reference or index miss).
    ///
    /// UI callers that keep silent no-op semantics can ignore these.
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            Self::GroupNotFound(_) | Self::TodoNotFound { .. } | Self::IndexOutOfRange { .. }
        )
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::TodoNotFound { group_id, todo_id } => {
                write!(f, "todo not found: {todo_id} in group {group_id}")
            }
            Self::IndexOutOfRange {
                group_id,
                index,
                len,
            } => write!(
                f,
                "index {index} out of range for group {group_id} (len {len})"
            ),
            Self::Encode(err) => write!(f, "{err}"),
            Self::Persist(err) => write!(f, "failed to persist snapshot: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(err) => Some(err),
            Self::Persist(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CollectionError> for StoreError {
    fn from(value: CollectionError) -> Self {
        match value {
            CollectionError::GroupNotFound(id) => Self::GroupNotFound(id),
            CollectionError::TodoNotFound { group_id, todo_id } => {
                Self::TodoNotFound { group_id, todo_id }
            }
            CollectionError::IndexOutOfRange {
                group_id,
                index,
                len,
            } => Self::IndexOutOfRange {
                group_id,
                index,
                len,
            },
        }
    }
}

/// Handle returned by [`TodoStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Arc<Collection>)>;

/// Collection store facade over a durable slot repository.
pub struct TodoStore<R: SlotRepository> {
    repo: R,
    slot_key: String,
    current: Arc<Collection>,
    subscribers: BTreeMap<SubscriptionId, Subscriber>,
    next_subscription: u64,
}

impl<R: SlotRepository> TodoStore<R> {
    /// Creates a store and loads its initial snapshot from `slot_key`.
    ///
    /// Never fails: a missing, unreadable or malformed snapshot starts the
    /// store empty and is reported only through logs.
    pub fn load(repo: R, slot_key: impl Into<String>) -> Self {
        let slot_key = slot_key.into();
        let current = Arc::new(load_collection(&repo, &slot_key));
        Self {
            repo,
            slot_key,
            current,
            subscribers: BTreeMap::new(),
            next_subscription: 0,
        }
    }

    /// Current immutable snapshot.
    pub fn snapshot(&self) -> Arc<Collection> {
        Arc::clone(&self.current)
    }

    pub fn slot_key(&self) -> &str {
        &self.slot_key
    }

    /// Registers a callback invoked with each new snapshot.
    ///
    /// Callbacks run in subscription order, after the snapshot write.
    pub fn subscribe(&mut self, callback: impl FnMut(&Arc<Collection>) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.insert(id, Box::new(callback));
        id
    }

    /// Removes one subscriber. Returns `false` when the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Re-reads the slot and replaces the current snapshot.
    ///
    /// Subscribers are notified; nothing is written back.
    pub fn reload(&mut self) -> Arc<Collection> {
        self.current = Arc::new(load_collection(&self.repo, &self.slot_key));
        self.notify();
        self.snapshot()
    }

    /// Appends a new empty group and returns its id.
    pub fn create_group(&mut self, title: impl Into<String>) -> StoreResult<GroupId> {
        let group = Group::new(title);
        let group_id = group.id.clone();
        let next = self.current.with_group_appended(group);
        self.commit("create_group", next)?;
        Ok(group_id)
    }

    /// Removes a group together with its todos.
    pub fn delete_group(&mut self, group_id: &str) -> StoreResult<()> {
        let next = self.current.without_group(group_id);
        self.apply("delete_group", next)
    }

    pub fn rename_group(&mut self, group_id: &str, title: impl Into<String>) -> StoreResult<()> {
        let next = self.current.with_group_title(group_id, title);
        self.apply("rename_group", next)
    }

    /// Appends an open todo to the end of the group and returns its id.
    pub fn add_todo(
        &mut self,
        group_id: &str,
        text: impl Into<String>,
        color: TodoColor,
    ) -> StoreResult<TodoId> {
        let todo = Todo::new(text, color);
        let todo_id = todo.id.clone();
        let next = self.current.with_todo_appended(group_id, todo);
        self.apply("add_todo", next)?;
        Ok(todo_id)
    }

    pub fn delete_todo(&mut self, group_id: &str, todo_id: &str) -> StoreResult<()> {
        let next = self.current.without_todo(group_id, todo_id);
        self.apply("delete_todo", next)
    }

    /// Flips the todo's completed flag.
    pub fn toggle_todo(&mut self, group_id: &str, todo_id: &str) -> StoreResult<()> {
        let next = self.current.with_todo_toggled(group_id, todo_id);
        self.apply("toggle_todo", next)
    }

    pub fn set_todo_color(
        &mut self,
        group_id: &str,
        todo_id: &str,
        color: TodoColor,
    ) -> StoreResult<()> {
        let next = self.current.with_todo_color(group_id, todo_id, color);
        self.apply("set_todo_color", next)
    }

    pub fn set_todo_text(
        &mut self,
        group_id: &str,
        todo_id: &str,
        text: impl Into<String>,
    ) -> StoreResult<()> {
        let next = self.current.with_todo_text(group_id, todo_id, text);
        self.apply("set_todo_text", next)
    }

    /// Moves one todo by position, within a group or across groups.
    ///
    /// Indices are validated against the sequences at call time. A move to
    /// the same position in the same group is accepted without a write.
    pub fn move_todo(
        &mut self,
        source_group_id: &str,
        dest_group_id: &str,
        source_index: usize,
        dest_index: usize,
    ) -> StoreResult<()> {
        let next = self.current.with_todo_moved(
            source_group_id,
            dest_group_id,
            source_index,
            dest_index,
        )?;
        if source_group_id == dest_group_id && source_index == dest_index {
            debug!("event=store_mutation module=store op=move_todo status=skipped reason=same_position");
            return Ok(());
        }
        self.commit("move_todo", next)
    }

    /// Drops every group and removes the slot, so the next load starts
    /// from an absent snapshot.
    pub fn clear(&mut self) -> StoreResult<()> {
        self.publish("clear", Collection::new(), |store| {
            store
                .repo
                .clear_slot(&store.slot_key)
                .map_err(StoreError::Persist)
        })
    }

    fn apply(
        &mut self,
        op: &'static str,
        next: Result<Collection, CollectionError>,
    ) -> StoreResult<()> {
        match next {
            Ok(next) => self.commit(op, next),
            Err(err) => {
                debug!("event=store_mutation module=store op={op} status=noop reason={err}");
                Err(err.into())
            }
        }
    }

    fn commit(&mut self, op: &'static str, next: Collection) -> StoreResult<()> {
        self.publish(op, next, Self::persist)
    }

    fn publish(
        &mut self,
        op: &'static str,
        next: Collection,
        write: impl FnOnce(&Self) -> StoreResult<()>,
    ) -> StoreResult<()> {
        self.current = Arc::new(next);
        let persisted = write(&*self);
        self.notify();
        match &persisted {
            Ok(()) => debug!(
                "event=store_mutation module=store op={op} status=ok groups={} todos={}",
                self.current.len(),
                self.current.todo_count()
            ),
            Err(err) => error!(
                "event=store_mutation module=store op={op} status=persist_failed error={err}"
            ),
        }
        persisted
    }

    fn persist(&self) -> StoreResult<()> {
        let raw = snapshot::encode(&self.current).map_err(StoreError::Encode)?;
        self.repo
            .write_slot(&self.slot_key, &raw)
            .map_err(StoreError::Persist)
    }

    fn notify(&mut self) {
        for callback in self.subscribers.values_mut() {
            callback(&self.current);
        }
    }
}

fn load_collection<R: SlotRepository>(repo: &R, slot_key: &str) -> Collection {
    let started_at = Instant::now();
    let raw = match repo.read_slot(slot_key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            info!(
                "event=store_load module=store status=empty key={slot_key} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            return Collection::new();
        }
        Err(err) => {
            error!(
                "event=store_load module=store status=fallback reason=slot_read_failed key={slot_key} error={err}"
            );
            return Collection::new();
        }
    };

    match snapshot::decode(&raw) {
        Ok(collection) => {
            info!(
                "event=store_load module=store status=ok key={slot_key} groups={} todos={} duration_ms={}",
                collection.len(),
                collection.todo_count(),
                started_at.elapsed().as_millis()
            );
            collection
        }
        Err(err) => {
            error!(
                "event=store_load module=store status=fallback reason=malformed_snapshot key={slot_key} category={} bytes={}",
                err.category(),
                raw.len()
            );
            Collection::new()
        }
    }
}
