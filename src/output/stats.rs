//! Statistics over a saved crawl
//!
//! This module reads the checkpoint and content store of a crawl (finished
//! or interrupted) and summarizes them.

use crate::config::Config;
use crate::frontier::{find_checkpoint, load_checkpoint, Frontier};
use crate::storage::{open_existing_store, ContentStore, StorageResult};
use crate::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Whether a checkpoint was found; frontier counts are zero otherwise
    pub checkpoint_found: bool,

    /// URLs in the frontier
    pub urls_seen: usize,

    /// Frontier URLs that are target pages
    pub target_pages: usize,

    /// URLs already crawled
    pub urls_crawled: usize,

    /// Target pages not crawled yet
    pub pending_targets: usize,

    /// Records in the content store
    pub records_stored: usize,

    /// Stored records per label; an empty label counts as unlabeled
    pub records_by_label: BTreeMap<String, usize>,
}

/// Summarizes a frontier and a content store, either of which may not exist yet
pub fn collect_statistics(
    frontier: Option<&Frontier>,
    store: Option<&dyn ContentStore>,
) -> StorageResult<CrawlStatistics> {
    let mut stats = CrawlStatistics::default();

    if let Some(frontier) = frontier {
        stats.checkpoint_found = true;
        stats.urls_seen = frontier.len_all();
        stats.target_pages = frontier.len_matching();
        stats.urls_crawled = frontier.len_crawled();
        stats.pending_targets = frontier.pending_targets();
    }

    let Some(store) = store else {
        return Ok(stats);
    };

    for id in store.keys()? {
        let record = store.get(&id)?;
        *stats.records_by_label.entry(record.label).or_insert(0) += 1;
        stats.records_stored += 1;
    }

    Ok(stats)
}

/// Loads statistics for the crawl described by `config`
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - The checkpoint is malformed or the store unreadable
pub fn load_statistics(config: &Config) -> Result<CrawlStatistics> {
    let checkpoint_path = Path::new(&config.output.checkpoint_path);
    let frontier = match find_checkpoint(checkpoint_path) {
        Some(saved) => Some(load_checkpoint(&saved)?),
        None => {
            tracing::warn!("No checkpoint at {}", checkpoint_path.display());
            None
        }
    };

    let store = open_existing_store(config.output.backend, Path::new(&config.output.content_dir))?;
    Ok(collect_statistics(frontier.as_ref(), store.as_deref())?)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    if stats.checkpoint_found {
        println!("Frontier:");
        println!("  URLs seen: {}", stats.urls_seen);
        println!("  Target pages: {}", stats.target_pages);
        println!("  URLs crawled: {}", stats.urls_crawled);
        println!("  Target pages pending: {}", stats.pending_targets);
    } else {
        println!("Frontier: no checkpoint yet");
    }
    println!();

    println!("Stored Records: {}", stats.records_stored);
    let mut label_counts: Vec<_> = stats.records_by_label.iter().collect();
    label_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    for (label, count) in label_counts {
        let percentage = (*count as f64 / stats.records_stored as f64) * 100.0;
        let label = if label.is_empty() { "(unlabeled)" } else { label };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }

    if stats.target_pages > 0 {
        let done = stats.target_pages - stats.pending_targets;
        println!(
            "\nProgress: {:.1}% ({} / {} target pages crawled)",
            (done as f64 / stats.target_pages as f64) * 100.0,
            done,
            stats.target_pages
        );
    }
}
