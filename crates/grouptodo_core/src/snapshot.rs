//! JSON snapshot codec for the persisted collection.
//!
//! # Responsibility
//! - Serialize the whole collection as an array of groups with nested todos.
//! - Decode persisted text with tolerance for missing, extra and mistyped
//!   fields.
//!
//! # Invariants
//! - No version field is written; the payload is the bare group array.
//! - Fields that are missing, `null` or of the wrong type take their
//!   defaults, and blank ids are replaced. Only text that is not JSON, or a
//!   root that is not an array, is a decode error.

use crate::model::collection::Collection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Snapshot encode/decode failure.
#[derive(Debug)]
pub enum SnapshotError {
    Encode(serde_json::Error),
    Decode(serde_json::Error),
}

impl SnapshotError {
    /// Short category label for metadata-only logs.
    pub fn category(&self) -> &'static str {
        let inner = match self {
            Self::Encode(err) | Self::Decode(err) => err,
        };
        match inner.classify() {
            serde_json::error::Category::Io => "io",
            serde_json::error::Category::Syntax => "syntax",
            serde_json::error::Category::Data => "data",
            serde_json::error::Category::Eof => "eof",
        }
    }
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(err) => write!(f, "failed to encode snapshot: {err}"),
            Self::Decode(err) => write!(f, "failed to decode snapshot: {err}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(err) | Self::Decode(err) => Some(err),
        }
    }
}

/// Serializes the collection to snapshot text.
pub fn encode(collection: &Collection) -> Result<String, SnapshotError> {
    serde_json::to_string(collection).map_err(SnapshotError::Encode)
}

/// Parses snapshot text into a collection.
pub fn decode(raw: &str) -> Result<Collection, SnapshotError> {
    serde_json::from_str(raw).map_err(SnapshotError::Decode)
}
