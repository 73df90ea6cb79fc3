//! Runtime configuration resolved from environment variables.
//!
//! # Invariants
//! - Blank or whitespace-only values count as unset.
//! - Every field has a usable default except `log_dir`, which keeps file
//!   logging off when unset.

use crate::logging::default_log_level;
use crate::service::store::DEFAULT_SLOT_KEY;
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "GROUPTODO_DB_PATH";
pub const ENV_SLOT_KEY: &str = "GROUPTODO_SLOT_KEY";
pub const ENV_LOG_LEVEL: &str = "GROUPTODO_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "GROUPTODO_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "grouptodo.sqlite3";

/// Resolved settings for opening the store and its logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite file holding the durable slot.
    pub db_path: PathBuf,
    /// Key of the slot holding the collection snapshot.
    pub slot_key: String,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            slot_key: DEFAULT_SLOT_KEY.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Reads `GROUPTODO_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|trimmed| !trimmed.is_empty())
        };

        let defaults = Self::default();
        Self {
            db_path: value(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            slot_key: value(ENV_SLOT_KEY).unwrap_or(defaults.slot_key),
            log_level: value(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: value(ENV_LOG_DIR).map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{StoreConfig, ENV_DB_PATH, ENV_LOG_DIR, ENV_SLOT_KEY};
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn from_lookup_uses_defaults_for_blank_values() {
        let vars = HashMap::from([(ENV_SLOT_KEY, "   "), (ENV_LOG_DIR, "")]);
        let config = StoreConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config, StoreConfig::default());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn from_lookup_trims_and_applies_overrides() {
        let vars = HashMap::from([
            (ENV_DB_PATH, " /tmp/todos.sqlite3 "),
            (ENV_SLOT_KEY, "work"),
            (ENV_LOG_DIR, "/var/log/grouptodo"),
        ]);
        let config = StoreConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.db_path, PathBuf::from("/tmp/todos.sqlite3"));
        assert_eq!(config.slot_key, "work");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/grouptodo")));
    }
}
