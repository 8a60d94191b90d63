//! Directory-of-files content store
//!
//! Each record is `<id>.txt` (label on the first line, body after it), with
//! an optional gzip-compressed original document beside it as `<id>.html.gz`.
//! Files are written to a temp file in the same directory and renamed into
//! place, so a reader never sees a partial record.

use crate::storage::compress::{compress, decompress};
use crate::storage::traits::{
    validate_record, ContentRecord, ContentStore, StorageError, StorageResult,
};
use std::collections::BTreeSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const RECORD_EXT: &str = ".txt";
const RAW_EXT: &str = ".html.gz";

/// Content store backed by one directory
#[derive(Debug)]
pub struct FileContentStore {
    dir: PathBuf,
}

impl FileContentStore {
    /// Opens a store, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", id, RECORD_EXT))
    }

    fn raw_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", id, RAW_EXT))
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> StorageResult<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }
}

impl ContentStore for FileContentStore {
    fn put(
        &mut self,
        id: &str,
        label: &str,
        text: &str,
        raw: Option<&str>,
    ) -> StorageResult<()> {
        validate_record(id, label)?;

        let raw = raw.map(compress).transpose()?;

        // A stale raw document goes first and the new one last, so an
        // interrupted put can leave a record without its raw document but
        // never pair a record with another version's raw document.
        match fs::remove_file(self.raw_path(id)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.write_atomic(
            &self.record_path(id),
            format!("{}\n{}\n", label, text).as_bytes(),
        )?;

        if let Some(raw) = raw {
            self.write_atomic(&self.raw_path(id), &raw)?;
        }

        tracing::debug!("Stored record {} in {}", id, self.dir.display());
        Ok(())
    }

    fn get(&self, id: &str) -> StorageResult<ContentRecord> {
        validate_record(id, "")?;

        let contents = match fs::read_to_string(self.record_path(id)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let (label, text) = contents
            .split_once('\n')
            .ok_or_else(|| StorageError::Corrupt(format!("record '{}' has no label line", id)))?;

        Ok(ContentRecord {
            label: label.to_string(),
            text: text.strip_suffix('\n').unwrap_or(text).to_string(),
        })
    }

    fn get_raw(&self, id: &str) -> StorageResult<Option<String>> {
        validate_record(id, "")?;

        match fs::read(self.raw_path(id)) {
            Ok(bytes) => Ok(Some(decompress(&bytes, id)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> StorageResult<BTreeSet<String>> {
        let mut keys = BTreeSet::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            // Leftover temp files start with '.' and never match.
            if let Some(id) = name.strip_suffix(RECORD_EXT) {
                if validate_record(id, "").is_ok() {
                    keys.insert(id.to_string());
                }
            }
        }

        Ok(keys)
    }
}
