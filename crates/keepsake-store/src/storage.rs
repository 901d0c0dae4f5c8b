//! Local key-value slot storage.
//!
//! The journal keeps its whole collection in one named slot as a JSON array.
//! [`SlotStorage`] is the seam between the store and wherever that slot
//! lives; two implementations ship here.
//!
//! # Storage layout
//!
//! [`SqliteSlotStorage`] creates a single table `kv_slots` (if it does not
//! already exist):
//!
//! | column     | type | description                          |
//! |------------|------|--------------------------------------|
//! | key        | TEXT | slot name, primary key               |
//! | value      | TEXT | slot contents (JSON text)            |
//! | updated_at | TEXT | RFC-3339 time of the last write (UTC) |
//!
//! # Example
//!
//! ```rust
//! use keepsake_store::storage::{SlotStorage, SqliteSlotStorage};
//!
//! let storage = SqliteSlotStorage::open_in_memory().unwrap();
//! storage.write("collegeMemories", "[]").unwrap();
//! assert_eq!(storage.read("collegeMemories").unwrap().as_deref(), Some("[]"));
//! ```

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

/// Slot name used when the configuration does not pick one.
pub const DEFAULT_SLOT: &str = "collegeMemories";

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise while reading or writing a slot.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// SlotStorage
// ─────────────────────────────────────────────────────────────────────────────

/// A string-valued key-value store.
pub trait SlotStorage: Send {
    /// Return the slot contents, or `None` if the slot has never been written.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite the slot contents.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// SqliteSlotStorage
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite-backed slot storage.
pub struct SqliteSlotStorage {
    conn: Connection,
}

impl SqliteSlotStorage {
    /// Open (or create) a persistent SQLite database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Open a temporary in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv_slots (
                key        TEXT NOT NULL PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl SlotStorage for SqliteSlotStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_slots WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO kv_slots (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// InMemorySlotStorage
// ─────────────────────────────────────────────────────────────────────────────

/// Process-local slot storage; contents vanish with the process.
#[derive(Default)]
pub struct InMemorySlotStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl InMemorySlotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a slot, e.g. with a snapshot written by another session.
    pub fn with_slot(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_string());
        storage
    }
}

impl SlotStorage for InMemorySlotStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| StorageError::Unavailable("slot map lock poisoned".to_string()))?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StorageError::Unavailable("slot map lock poisoned".to_string()))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_missing_slot_reads_none() {
        let storage = SqliteSlotStorage::open_in_memory().unwrap();
        assert!(storage.read(DEFAULT_SLOT).unwrap().is_none());
    }

    #[test]
    fn sqlite_write_overwrites_previous_value() {
        let storage = SqliteSlotStorage::open_in_memory().unwrap();
        storage.write("k", "[1]").unwrap();
        storage.write("k", "[1,2]").unwrap();
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("[1,2]"));
    }

    #[test]
    fn sqlite_slots_are_independent() {
        let storage = SqliteSlotStorage::open_in_memory().unwrap();
        storage.write("a", "1").unwrap();
        storage.write("b", "2").unwrap();
        assert_eq!(storage.read("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.read("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn sqlite_file_survives_reopen() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("journal.db");
        {
            let storage = SqliteSlotStorage::open(&path).unwrap();
            storage.write(DEFAULT_SLOT, "[]").unwrap();
        }
        let reopened = SqliteSlotStorage::open(&path).unwrap();
        assert_eq!(reopened.read(DEFAULT_SLOT).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn in_memory_seeded_slot_is_readable() {
        let storage = InMemorySlotStorage::with_slot("k", "v");
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("v"));
        storage.write("k", "w").unwrap();
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("w"));
    }
}
