//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the durable key-value slot contract used by the store.
//! - Isolate SQLite query details from store orchestration.

pub mod slot_repo;
