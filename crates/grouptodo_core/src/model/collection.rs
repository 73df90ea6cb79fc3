//! Ordered group collection and its value-returning transformations.
//!
//! # Responsibility
//! - Hold the full group/todo state as one serializable value.
//! - Compute every mutation as a new `Collection` from the old one.
//!
//! # Invariants
//! - Group order is creation order and is never rearranged.
//! - A failed transformation returns an error and produces no value, so the
//!   caller's current collection stays as it was.
//! - `with_todo_moved` removes and inserts in one step; the moved todo is never
//!   present in zero or two groups of the returned value.
//! - A decoded collection never holds a blank or repeated id.

use super::group::{Group, GroupId};
use super::lenient;
use super::todo::{Todo, TodoColor, TodoId};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for collection transformations.
pub type CollectionResult<T> = Result<T, CollectionError>;

/// Reasons a transformation could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// No group with this id exists.
    GroupNotFound(GroupId),
    /// The group exists but holds no todo with this id.
    TodoNotFound { group_id: GroupId, todo_id: TodoId },
    /// A move index is outside the valid range for the group. `len` is the
    /// group's todo count before the move.
    IndexOutOfRange {
        group_id: GroupId,
        index: usize,
        len: usize,
    },
}

impl Display for CollectionError {
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
        }
    }
}

impl Error for CollectionError {}

fn todo_not_found(group_id: &str, todo_id: &str) -> CollectionError {
    CollectionError::TodoNotFound {
        group_id: group_id.to_string(),
        todo_id: todo_id.to_string(),
    }
}

/// Ordered sequence of groups; the unit of persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Collection {
    groups: Vec<Group>,
}

// The root must be an array. Entries that are not group objects are dropped,
// then blank or repeated ids are replaced with fresh ones.
impl<'de> Deserialize<'de> for Collection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut groups: Vec<Group> = lenient::entries(Vec::<Value>::deserialize(deserializer)?);
        assign_missing_ids(&mut groups);
        Ok(Collection { groups })
    }
}

fn assign_missing_ids(groups: &mut [Group]) {
    let mut group_ids = HashSet::new();
    let mut todo_ids = HashSet::new();
    for group in groups {
        if group.id.is_empty() || !group_ids.insert(group.id.clone()) {
            group.id = fresh_id(&mut group_ids);
        }
        for todo in &mut group.todos {
            if todo.id.is_empty() || !todo_ids.insert(todo.id.clone()) {
                todo.id = fresh_id(&mut todo_ids);
            }
        }
    }
}

fn fresh_id(taken: &mut HashSet<String>) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    taken.insert(id.clone());
    id
}

impl Collection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from groups in display order.
    pub fn from_groups(groups: Vec<Group>) -> Self {
        Self { groups }
    }

    /// Groups in display order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, group_id: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == group_id)
    }

    pub fn todo(&self, group_id: &str, todo_id: &str) -> Option<&Todo> {
        self.group(group_id).and_then(|group| group.todo(todo_id))
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of todos across all groups.
    pub fn todo_count(&self) -> usize {
        self.groups.iter().map(|group| group.todos.len()).sum()
    }

    /// Returns a copy with `group` appended at the end.
    pub fn with_group_appended(&self, group: Group) -> Collection {
        let mut groups = self.groups.clone();
        groups.push(group);
        Collection { groups }
    }

    /// Returns a copy without the group (and its todos).
    pub fn without_group(&self, group_id: &str) -> CollectionResult<Collection> {
        let position = self.group_position(group_id)?;
        let mut groups = self.groups.clone();
        groups.remove(position);
        Ok(Collection { groups })
    }

    /// Returns a copy with the group title replaced.
    pub fn with_group_title(
        &self,
        group_id: &str,
        title: impl Into<String>,
    ) -> CollectionResult<Collection> {
        let title = title.into();
        self.map_group(group_id, |group| {
            group.title = title;
            Ok(())
        })
    }

    /// Returns a copy with `todo` appended to the end of the group.
    pub fn with_todo_appended(&self, group_id: &str, todo: Todo) -> CollectionResult<Collection> {
        self.map_group(group_id, |group| {
            group.todos.push(todo);
            Ok(())
        })
    }

    /// Returns a copy without the todo.
    pub fn without_todo(&self, group_id: &str, todo_id: &str) -> CollectionResult<Collection> {
        self.map_group(group_id, |group| {
            let position = group
                .todo_position(todo_id)
                .ok_or_else(|| todo_not_found(group_id, todo_id))?;
            group.todos.remove(position);
            Ok(())
        })
    }

    /// Returns a copy with the todo's `completed` flag flipped.
    pub fn with_todo_toggled(
        &self,
        group_id: &str,
        todo_id: &str,
    ) -> CollectionResult<Collection> {
        self.map_todo(group_id, todo_id, |todo| todo.completed = !todo.completed)
    }

    /// Returns a copy with the todo's color replaced.
    pub fn with_todo_color(
        &self,
        group_id: &str,
        todo_id: &str,
        color: TodoColor,
    ) -> CollectionResult<Collection> {
        self.map_todo(group_id, todo_id, |todo| todo.color = color)
    }

    /// Returns a copy with the todo's text replaced.
    pub fn with_todo_text(
        &self,
        group_id: &str,
        todo_id: &str,
        text: impl Into<String>,
    ) -> CollectionResult<Collection> {
        let text = text.into();
        self.map_todo(group_id, todo_id, |todo| todo.text = text)
    }

    /// Returns a copy with one todo relocated.
    ///
    /// Within one group, the todo at `source_index` is removed first and then
    /// inserted at `dest_index` of the shortened sequence. Across groups the
    /// same todo value is removed from the source and inserted into the
    /// destination.
    ///
    /// # Errors
    /// - `GroupNotFound` when either group is missing.
    /// - `IndexOutOfRange` when `source_index >= source.len()`, or when
    ///   `dest_index` exceeds the insert range (`source.len() - 1` within one
    ///   group, `dest.len()` across groups). The error carries the index that
    ///   was rejected and the todo count of the group it refers to.
    pub fn with_todo_moved(
        &self,
        source_group_id: &str,
        dest_group_id: &str,
        source_index: usize,
        dest_index: usize,
    ) -> CollectionResult<Collection> {
        let source_position = self.group_position(source_group_id)?;
        let dest_position = self.group_position(dest_group_id)?;

        let source_len = self.groups[source_position].todos.len();
        if source_index >= source_len {
            return Err(CollectionError::IndexOutOfRange {
                group_id: source_group_id.to_string(),
                index: source_index,
                len: source_len,
            });
        }

        let dest_len = self.groups[dest_position].todos.len();
        // Same-group inserts index into the sequence after removal.
        let insert_limit = if source_position == dest_position {
            source_len - 1
        } else {
            dest_len
        };
        if dest_index > insert_limit {
            return Err(CollectionError::IndexOutOfRange {
                group_id: dest_group_id.to_string(),
                index: dest_index,
                len: dest_len,
            });
        }

        let mut groups = self.groups.clone();
        let moved = groups[source_position].todos.remove(source_index);
        groups[dest_position].todos.insert(dest_index, moved);
        Ok(Collection { groups })
    }

    fn group_position(&self, group_id: &str) -> CollectionResult<usize> {
        self.groups
            .iter()
            .position(|group| group.id == group_id)
            .ok_or_else(|| CollectionError::GroupNotFound(group_id.to_string()))
    }

    fn map_group(
        &self,
        group_id: &str,
        f: impl FnOnce(&mut Group) -> CollectionResult<()>,
    ) -> CollectionResult<Collection> {
        let position = self.group_position(group_id)?;
        let mut groups = self.groups.clone();
        f(&mut groups[position])?;
        Ok(Collection { groups })
    }

    fn map_todo(
        &self,
        group_id: &str,
        todo_id: &str,
        f: impl FnOnce(&mut Todo),
    ) -> CollectionResult<Collection> {
        self.map_group(group_id, |group| {
            let todo = group
                .todos
                .iter_mut()
                .find(|todo| todo.id == todo_id)
                .ok_or_else(|| todo_not_found(group_id, todo_id))?;
            f(todo);
            Ok(())
        })
    }
}
