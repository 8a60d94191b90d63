//! Storage traits and error types
//!
//! This module defines the trait interface for content store backends and
//! associated error types.

use std::collections::BTreeSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Label and normalized body text stored for one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub label: String,
    pub text: String,
}

/// Trait for content store implementations
///
/// Records are keyed by identifier. Writing an identifier again replaces
/// everything stored for it, so repeated writes are harmless.
pub trait ContentStore {
    /// Stores a record, replacing any previous one with the same id
    ///
    /// # Arguments
    ///
    /// * `id` - The record identifier
    /// * `label` - Single-line label, possibly empty
    /// * `text` - Normalized body text
    /// * `raw` - The original document; `None` removes a stored one
    fn put(&mut self, id: &str, label: &str, text: &str, raw: Option<&str>)
        -> StorageResult<()>;

    /// Loads a record; `StorageError::NotFound` if absent
    fn get(&self, id: &str) -> StorageResult<ContentRecord>;

    /// Loads the original document, if one was stored
    fn get_raw(&self, id: &str) -> StorageResult<Option<String>>;

    /// Every stored identifier
    fn keys(&self) -> StorageResult<BTreeSet<String>>;
}

/// Checks that an identifier and label can be stored safely
///
/// Ids become file names, so they must be non-empty, must not contain a path
/// separator or NUL, and must not start with `.`. Labels are written as a
/// single line.
pub fn validate_record(id: &str, label: &str) -> StorageResult<()> {
    if id.is_empty() {
        return Err(StorageError::InvalidRecord("empty id".to_string()));
    }

    if id.starts_with('.') || id.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidRecord(format!(
            "id '{}' is not a plain name",
            id.escape_debug()
        )));
    }

    if label.contains(['\n', '\r']) {
        return Err(StorageError::InvalidRecord(format!(
            "label for '{}' spans multiple lines",
            id
        )));
    }

    Ok(())
}
