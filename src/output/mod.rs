//! Output module for reporting on a crawl
//!
//! This module handles:
//! - Statistics over the checkpoint and content store
//! - A preview listing of stored records

mod preview;
pub mod stats;

pub use preview::{load_preview, print_preview, PreviewEntry, PREVIEW_CHARS};
pub use stats::{collect_statistics, load_statistics, print_statistics, CrawlStatistics};
