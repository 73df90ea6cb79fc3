//! Core state logic for GroupTodo.
//! This crate owns the group/todo collection and its durable snapshot.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod snapshot;

pub use config::StoreConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::collection::{Collection, CollectionError, CollectionResult};
pub use model::group::{Group, GroupId};
pub use model::todo::{Todo, TodoColor, TodoId};
pub use repo::slot_repo::{
    MemorySlotRepository, SlotRepoError, SlotRepoResult, SlotRepository, SqliteSlotRepository,
};
pub use snapshot::SnapshotError;
pub use service::store::{
    StoreError, StoreResult, SubscriptionId, TodoStore, DEFAULT_SLOT_KEY,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
