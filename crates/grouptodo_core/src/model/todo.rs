//! Todo entry model.
//!
//! # Invariants
//! - `id` is stable for the lifetime of the todo, including across moves.
//! - New todos start with `completed = false`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

use super::{lenient, now_epoch_ms};

/// Stable todo identifier, unique across all groups.
///
/// Ids minted here are hyphenated v4 UUIDs, but any non-empty string loaded
/// from a snapshot is kept as-is.
pub type TodoId = String;

/// Color tag shown next to a todo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoColor {
    #[default]
    Default,
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
}

impl TodoColor {
    /// All colors in picker order.
    pub const ALL: [TodoColor; 6] = [
        TodoColor::Default,
        TodoColor::Red,
        TodoColor::Blue,
        TodoColor::Green,
        TodoColor::Yellow,
        TodoColor::Purple,
    ];

    /// Returns the lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Purple => "purple",
        }
    }

    /// Parses a color name case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|color| color.as_str() == normalized)
    }
}

impl Display for TodoColor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Unknown names, `null` and non-string values decode as `Default`.
impl<'de> Deserialize<'de> for TodoColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Value::deserialize(deserializer)?
            .as_str()
            .and_then(TodoColor::parse)
            .unwrap_or_default())
    }
}

/// One task entry inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Blank when the stored snapshot had none; `Collection` decoding replaces
    /// blank ids before the value is handed out.
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: TodoId,
    #[serde(default, deserialize_with = "lenient::string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub completed: bool,
    #[serde(default)]
    pub color: TodoColor,
    /// Unix epoch milliseconds.
    #[serde(default, deserialize_with = "lenient::epoch_ms")]
    pub created_at: i64,
}

impl Todo {
    /// Creates an open todo with a generated id and current timestamp.
    pub fn new(text: impl Into<String>, color: TodoColor) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            completed: false,
            color,
            created_at: now_epoch_ms(),
        }
    }
}
