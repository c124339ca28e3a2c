//! SQLite-backed store
//!
//! Entries are stored as JSON text under their key in a single table, the
//! durable stand-in for a browser profile's localStorage.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use super::{StoreBackend, StoreError};

/// Default database file name inside the data directory
pub const DB_FILE: &str = "dashboard.db";

/// Key-value entries in a SQLite database file
pub struct SqliteBackend {
    db: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open or create `<data_dir>/dashboard.db`.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join(DB_FILE);
        let db = Connection::open(&db_path)?;

        db.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init_schema(&db)?;

        info!(path = %db_path.display(), "Dashboard store opened");

        Ok(Self { db: Mutex::new(db) })
    }

    /// Non-durable database, mostly for tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn init_schema(db: &Connection) -> Result<(), StoreError> {
        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            );",
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.db
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }
}

impl StoreBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let db = self.conn()?;
        let mut stmt = db.prepare_cached("SELECT value FROM entries WHERE key = ?1")?;
        let value = stmt
            .query_row([key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO entries (key, value, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now'))
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = strftime('%s', 'now')",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.conn()?.execute("DELETE FROM entries", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let backend = SqliteBackend::open(dir.path()).unwrap();
            backend.set("mangrove.projects", "[1,2,3]").unwrap();
            backend.set("mangrove.projects", "[3,2,1]").unwrap();
        }

        let backend = SqliteBackend::open(dir.path()).unwrap();
        assert_eq!(
            backend.get("mangrove.projects").unwrap().as_deref(),
            Some("[3,2,1]")
        );
        assert!(dir.path().join(DB_FILE).exists());
    }

    #[test]
    fn test_clear_drops_every_entry() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.set("a", "1").unwrap();
        backend.set("b", "2").unwrap();

        backend.clear().unwrap();
        assert!(backend.get("a").unwrap().is_none());
        assert!(backend.get("b").unwrap().is_none());
    }
}
