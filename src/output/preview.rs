//! Preview listing of stored records
//!
//! Shows what a downstream consumer would read: every id with its label and
//! the beginning of its text and raw document.

use crate::storage::{ContentStore, StorageResult};

/// Characters of text and raw document shown per record
pub const PREVIEW_CHARS: usize = 25;

/// One line of the preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewEntry {
    pub id: String,
    pub label: String,
    pub text_prefix: String,
    /// `None` when no raw document was stored
    pub raw_prefix: Option<String>,
}

/// Reads every record in id order
pub fn load_preview(store: &dyn ContentStore) -> StorageResult<Vec<PreviewEntry>> {
    store
        .keys()?
        .into_iter()
        .map(|id| -> StorageResult<PreviewEntry> {
            let record = store.get(&id)?;
            let raw_prefix = store.get_raw(&id)?.map(|raw| prefix(&raw));
            Ok(PreviewEntry {
                text_prefix: prefix(&record.text),
                label: record.label,
                raw_prefix,
                id,
            })
        })
        .collect()
}

pub fn print_preview(entries: &[PreviewEntry]) {
    for entry in entries {
        match &entry.raw_prefix {
            Some(raw) => println!(
                "Retrieved post \"{}\", label \"{}\", beginning with \"{}\", raw begin \"{}\"",
                entry.id,
                entry.label,
                entry.text_prefix,
                raw.escape_debug()
            ),
            None => println!(
                "Retrieved post \"{}\", label \"{}\", beginning with \"{}\", no raw document",
                entry.id, entry.label, entry.text_prefix
            ),
        }
    }
    println!("\n{} records", entries.len());
}

fn prefix(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
