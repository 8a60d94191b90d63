//! Storage module for extracted content
//!
//! This module persists the label and body text of every target page,
//! keyed by the page's identifier:
//! - A directory of record files (the default)
//! - A SQLite table
//!
//! Both backends optionally keep the original document gzip-compressed.

mod compress;
mod files;
mod schema;
mod sqlite;
mod traits;

pub use files::FileContentStore;
pub use sqlite::SqliteContentStore;
pub use traits::{validate_record, ContentRecord, ContentStore, StorageError, StorageResult};

use crate::config::StoreBackend;
use std::path::Path;

/// Opens the configured content store
///
/// # Arguments
///
/// * `backend` - Which implementation to use
/// * `path` - Directory for `Files`, database file for `Sqlite`
pub fn open_store(backend: StoreBackend, path: &Path) -> StorageResult<Box<dyn ContentStore>> {
    tracing::debug!("Opening {:?} content store at {}", backend, path.display());

    Ok(match backend {
        StoreBackend::Files => Box::new(FileContentStore::open(path)?),
        StoreBackend::Sqlite => Box::new(SqliteContentStore::open(path)?),
    })
}

/// Opens the configured content store only if it already exists
///
/// Used by read-only commands, which must not create an empty store.
pub fn open_existing_store(
    backend: StoreBackend,
    path: &Path,
) -> StorageResult<Option<Box<dyn ContentStore>>> {
    if !path.exists() {
        tracing::debug!("No content store at {}", path.display());
        return Ok(None);
    }

    open_store(backend, path).map(Some)
}
