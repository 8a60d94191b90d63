//! SQLite content store
//!
//! This module provides a SQLite-based implementation of the ContentStore
//! trait. Every write is a single `INSERT OR REPLACE`, so a record is either
//! fully stored or not at all.

use crate::storage::compress::{compress, decompress};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    validate_record, ContentRecord, ContentStore, StorageError, StorageResult,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;

/// SQLite content store backend
pub struct SqliteContentStore {
    conn: Connection,
}

impl SqliteContentStore {
    /// Opens or creates the database at `path`
    ///
    /// Missing parent directories are created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// When a record was last written (RFC 3339)
    pub fn stored_at(&self, id: &str) -> StorageResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT stored_at FROM records WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?)
    }
}

impl ContentStore for SqliteContentStore {
    fn put(
        &mut self,
        id: &str,
        label: &str,
        text: &str,
        raw: Option<&str>,
    ) -> StorageResult<()> {
        validate_record(id, label)?;

        let raw = raw.map(compress).transpose()?;
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT OR REPLACE INTO records (id, label, body, raw, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, label, text, raw, now],
        )?;

        tracing::debug!("Stored record {} in database", id);
        Ok(())
    }

    fn get(&self, id: &str) -> StorageResult<ContentRecord> {
        self.conn
            .query_row(
                "SELECT label, body FROM records WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ContentRecord {
                        label: row.get(0)?,
                        text: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn get_raw(&self, id: &str) -> StorageResult<Option<String>> {
        let raw: Option<Option<Vec<u8>>> = self
            .conn
            .query_row(
                "SELECT raw FROM records WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match raw.flatten() {
            Some(bytes) => Ok(Some(decompress(&bytes, id)?)),
            None => Ok(None),
        }
    }

    fn keys(&self) -> StorageResult<BTreeSet<String>> {
        let mut stmt = self.conn.prepare("SELECT id FROM records")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(keys)
    }
}
