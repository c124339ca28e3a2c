//! Persistent store for the dashboard collections
//!
//! A small key-value layer in the shape of a browser's localStorage: each
//! collection lives under one key as a JSON array. Reads never fail past this
//! boundary (a missing or corrupted entry is reported as absent) and write
//! failures come back as values so callers can keep going with their
//! in-memory state.

pub mod memory;
pub mod sqlite;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Raw string key-value storage
pub trait StoreBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// Named entries in the store, one per collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Projects,
    Verifications,
    Transactions,
}

impl StoreKey {
    pub const ALL: [StoreKey; 3] = [Self::Projects, Self::Verifications, Self::Transactions];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Projects => "mangrove.projects",
            Self::Verifications => "mangrove.verifications",
            Self::Transactions => "mangrove.transactions",
        }
    }
}

/// Typed collection store over a backend
pub struct Store {
    backend: Box<dyn StoreBackend>,
}

impl Store {
    pub fn new(backend: impl StoreBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Session-only store, nothing survives the process
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Load a collection; `None` if the entry is missing or unreadable.
    pub fn load<T: DeserializeOwned>(&self, key: StoreKey) -> Option<Vec<T>> {
        let raw = match self.backend.get(key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "Failed to read store entry");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => Some(records),
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "Ignoring corrupted store entry");
                None
            }
        }
    }

    /// Persist a whole collection.
    ///
    /// Failures are logged here; the error is returned for the caller to
    /// record, not to abort on.
    pub fn save<T: Serialize>(&self, key: StoreKey, records: &[T]) -> Result<(), StoreError> {
        let result = serde_json::to_string(records)
            .map_err(StoreError::from)
            .and_then(|json| {
                self.backend.set(key.as_str(), &json)?;
                Ok(json.len())
            });

        match result {
            Ok(bytes) => {
                debug!(key = key.as_str(), records = records.len(), bytes, "Saved collection");
                Ok(())
            }
            Err(e) => {
                warn!(
                    key = key.as_str(),
                    error = %e,
                    "Failed to persist collection, keeping in-memory state"
                );
                Err(e)
            }
        }
    }

    /// Load a collection, seeding and persisting `defaults` when absent.
    pub fn load_or_seed<T, F>(&self, key: StoreKey, defaults: F) -> Vec<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Vec<T>,
    {
        if let Some(records) = self.load(key) {
            return records;
        }

        let records = defaults();
        info!(key = key.as_str(), records = records.len(), "Seeding default collection");
        let _ = self.save(key, &records);
        records
    }

    /// Remove every entry
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.clear().inspect_err(|e| {
            warn!(error = %e, "Failed to clear store");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{defaults, Project};

    #[test]
    fn test_load_missing_is_absent() {
        let store = Store::in_memory();
        assert!(store.load::<Project>(StoreKey::Projects).is_none());
    }

    #[test]
    fn test_save_then_load_preserves_order() {
        let store = Store::in_memory();
        let mut projects = defaults::projects();
        projects.reverse();

        store.save(StoreKey::Projects, &projects).unwrap();
        let loaded: Vec<Project> = store.load(StoreKey::Projects).unwrap();

        assert_eq!(loaded, projects);
    }

    #[test]
    fn test_corrupted_entry_is_absent() {
        let backend = MemoryBackend::new();
        backend.set(StoreKey::Projects.as_str(), "{not json").unwrap();
        let store = Store::new(backend);

        assert!(store.load::<Project>(StoreKey::Projects).is_none());
    }

    #[test]
    fn test_load_or_seed_is_idempotent() {
        let store = Store::in_memory();

        let first = store.load_or_seed(StoreKey::Projects, defaults::projects);
        let second = store.load_or_seed(StoreKey::Projects, Vec::<Project>::new);

        assert_eq!(first, defaults::projects());
        assert_eq!(second, first);
    }

    #[test]
    fn test_save_over_quota_fails_without_panicking() {
        let store = Store::new(MemoryBackend::with_quota(16));
        let result = store.save(StoreKey::Projects, &defaults::projects());

        assert!(matches!(result, Err(StoreError::QuotaExceeded { .. })));
        assert!(store.load::<Project>(StoreKey::Projects).is_none());
    }

    #[test]
    fn test_clear_removes_all_keys() {
        let store = Store::in_memory();
        store.save(StoreKey::Projects, &defaults::projects()).unwrap();
        store.save(StoreKey::Transactions, &defaults::transactions()).unwrap();

        store.clear().unwrap();

        for key in StoreKey::ALL {
            assert!(store.load::<serde_json::Value>(key).is_none());
        }
    }
}
