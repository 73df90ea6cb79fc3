//! Group/todo domain model.
//!
//! # Responsibility
//! - Define the value types held by the collection store.
//! - Provide pure collection transformations that return new values.
//!
//! # Invariants
//! - Every group and todo is identified by a non-empty string id, unique
//!   among groups and among todos. New ids are random v4 UUIDs.
//! - A todo is owned by exactly one group.
//! - Transformations never mutate the input collection.

pub mod collection;
pub mod group;
mod lenient;
pub mod todo;

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns current Unix time in epoch milliseconds.
///
/// Falls back to `0` when the system clock is before the epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
