//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with backoff on transient failures
//! - HTML queries for links, content fields and identifiers
//! - Overall crawl coordination

mod backoff;
mod coordinator;
mod document;
mod fetcher;

pub use backoff::{Backoff, RetryPolicy};
pub use coordinator::{run_crawl, Coordinator, CrawlSummary};
pub use document::{normalize_text, DocumentView, HtmlDocument};
pub use fetcher::{build_http_client, classify_status, FetchResult, FetchedPage, Fetcher, StatusClass};
