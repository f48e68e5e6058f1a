//! SQLite-based store implementation

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::{Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl Store for SqliteStore {
    fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.conn()?;

        let value: Option<String> = conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| row.get(0))
            .optional()?;

        Ok(value)
    }

    fn set_value(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;

        debug!(key, value, "Value stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        store.set_value("k", "v").unwrap();
        assert_eq!(store.get_value("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_missing_key() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get_value("/scheduler/lastStarted").unwrap().is_none());
    }

    #[test]
    fn test_overwrite_value() {
        let store = SqliteStore::in_memory().unwrap();
        let key = "/scheduler/lastStarted";

        store.set_value(key, "1573261444114").unwrap();
        assert_eq!(store.get_value(key).unwrap().as_deref(), Some("1573261444114"));

        store.set_value(key, "1573265044114").unwrap();
        assert_eq!(store.get_value(key).unwrap().as_deref(), Some("1573265044114"));

        // Other keys are independent
        assert!(store.get_value("/other").unwrap().is_none());
    }

    #[test]
    fn test_value_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("offhoursd.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set_value("k", "42").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_value("k").unwrap().as_deref(), Some("42"));
    }
}
