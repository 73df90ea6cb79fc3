//! Group model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::todo::Todo;
use super::{lenient, now_epoch_ms};

/// Stable group identifier; same format rules as `TodoId`.
pub type GroupId = String;

/// Named, ordered container of todos.
///
/// `todos` order is the display and drag order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: GroupId,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    /// Entries that are not todo objects are dropped on decode.
    #[serde(default, deserialize_with = "lenient::list")]
    pub todos: Vec<Todo>,
    /// Unix epoch milliseconds.
    #[serde(default, deserialize_with = "lenient::epoch_ms")]
    pub created_at: i64,
}

impl Group {
    /// Creates an empty group with a generated id and current timestamp.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            todos: Vec::new(),
            created_at: now_epoch_ms(),
        }
    }

    /// Finds one todo by id.
    pub fn todo(&self, todo_id: &str) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == todo_id)
    }

    /// Returns the display position of one todo.
    pub fn todo_position(&self, todo_id: &str) -> Option<usize> {
        self.todos.iter().position(|todo| todo.id == todo_id)
    }

    /// Number of completed todos, for `done / total` progress.
    pub fn completed_count(&self) -> usize {
        self.todos.iter().filter(|todo| todo.completed).count()
    }
}
