//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Restoring the frontier from a checkpoint or seeding a fresh one
//! - Walking the frontier in passes until a pass discovers nothing new
//! - Extracting and storing the content of target pages
//! - Writing periodic and final checkpoints

use crate::config::Config;
use crate::crawler::{normalize_text, DocumentView, FetchResult, FetchedPage, Fetcher, HtmlDocument};
use crate::frontier::{find_checkpoint, load_checkpoint, save_checkpoint, Frontier};
use crate::storage::{open_store, ContentStore, StorageError};
use crate::url::UrlRules;
use crate::Result;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Outcome of a completed crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Full passes over the frontier, including the final idle one
    pub passes: usize,
    /// Pages fetched during this run
    pub pages_fetched: usize,
    /// Records written to the content store during this run
    pub records_stored: usize,
    /// URLs in the frontier at the end of the run
    pub urls_seen: usize,
    /// URLs marked crawled at the end of the run, across all runs
    pub urls_crawled: usize,
    pub elapsed: Duration,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    frontier: Frontier,
    fetcher: Fetcher,
    store: Box<dyn ContentStore>,
    checkpoint_path: PathBuf,
    checkpoint_interval: Duration,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fresh` - Ignore a saved checkpoint and start from the configured seeds
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - Failed to initialize
    pub fn new(config: Config, fresh: bool) -> Result<Self> {
        let checkpoint_path = PathBuf::from(&config.output.checkpoint_path);

        let saved = if fresh {
            None
        } else {
            find_checkpoint(&checkpoint_path)
        };

        let frontier = if let Some(saved) = saved {
            let frontier = load_checkpoint(&saved)?;
            tracing::info!(
                "Resuming from {} ({} URLs, {} crawled); configured seeds and patterns are ignored",
                saved.display(),
                frontier.len_all(),
                frontier.len_crawled()
            );
            frontier
        } else {
            if fresh && checkpoint_path.exists() {
                tracing::warn!(
                    "Starting fresh; {} will be replaced at the first checkpoint",
                    checkpoint_path.display()
                );
            }
            seeded_frontier(&config)?
        };

        let store = open_store(config.output.backend, Path::new(&config.output.content_dir))?;
        let fetcher = Fetcher::new(&config.fetcher)?;

        Ok(Self::with_parts(config, frontier, fetcher, store))
    }

    /// Assembles a coordinator from already constructed parts
    pub fn with_parts(
        config: Config,
        frontier: Frontier,
        fetcher: Fetcher,
        store: Box<dyn ContentStore>,
    ) -> Self {
        Self {
            checkpoint_path: PathBuf::from(&config.output.checkpoint_path),
            checkpoint_interval: Duration::from_secs(config.crawler.checkpoint_interval_secs),
            config,
            frontier,
            fetcher,
            store,
        }
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    /// Runs the main crawl loop
    ///
    /// Each pass walks a sorted snapshot of the frontier. A pass in which no
    /// URL was newly crawled and no new URL was discovered ends the crawl. A
    /// final checkpoint is always written; if the crawl fails, a checkpoint
    /// is still attempted before the error is returned.
    pub async fn run(&mut self) -> Result<CrawlSummary> {
        let started = Instant::now();
        let mut summary = CrawlSummary::default();

        if let Err(e) = self.run_passes(&mut summary, started).await {
            tracing::error!("Crawl aborted: {}", e);
            if let Err(save_err) = self.checkpoint() {
                tracing::error!("Failed to save checkpoint after abort: {}", save_err);
            }
            return Err(e);
        }

        self.checkpoint()?;

        summary.urls_seen = self.frontier.len_all();
        summary.urls_crawled = self.frontier.len_crawled();
        summary.elapsed = started.elapsed();

        tracing::info!(
            "Crawl completed: {} passes, {} pages fetched, {} records stored in {:.1}s",
            summary.passes,
            summary.pages_fetched,
            summary.records_stored,
            summary.elapsed.as_secs_f64()
        );

        Ok(summary)
    }

    async fn run_passes(
        &mut self,
        summary: &mut CrawlSummary,
        started: Instant,
    ) -> Result<()> {
        let mut last_checkpoint = Instant::now();

        loop {
            summary.passes += 1;
            let snapshot = self.frontier.snapshot();
            tracing::info!(
                "Pass {}: {} URLs, {} crawled, {} target pages pending",
                summary.passes,
                snapshot.len(),
                self.frontier.len_crawled(),
                self.frontier.pending_targets()
            );

            let mut progressed = false;
            for url in &snapshot {
                if self.process_url(url, summary).await? {
                    progressed = true;
                }

                if last_checkpoint.elapsed() >= self.checkpoint_interval {
                    self.checkpoint()?;
                    last_checkpoint = Instant::now();
                }
            }

            tracing::info!(
                "Pass {} done: {} records stored, {:.1}s elapsed",
                summary.passes,
                summary.records_stored,
                started.elapsed().as_secs_f64()
            );

            if !progressed {
                return Ok(());
            }
        }
    }

    /// Handles one snapshot URL, returning true if the frontier changed
    async fn process_url(
        &mut self,
        url: &str,
        summary: &mut CrawlSummary,
    ) -> Result<bool> {
        let is_target = self.frontier.is_target_page(url) == Some(true);

        if !is_target || self.frontier.already_crawled(url) {
            let visited = self.frontier.visit(url, &self.fetcher).await?;
            if visited {
                summary.pages_fetched += 1;
            }
            return Ok(visited);
        }

        summary.pages_fetched += 1;
        let links = match self.fetcher.fetch(url).await? {
            FetchResult::Success(page) => self.store_target(url, &page, summary)?,
            FetchResult::Skipped { status_code } => {
                tracing::info!("Target page {} unavailable (HTTP {})", url, status_code);
                Vec::new()
            }
        };

        Ok(self.frontier.record_visit(url, &links))
    }

    /// Extracts and stores a target page, returning its links
    ///
    /// A page missing its identifier or body is logged and not stored; its
    /// links are still returned so the crawl goes on.
    fn store_target(
        &mut self,
        url: &str,
        page: &FetchedPage,
        summary: &mut CrawlSummary,
    ) -> Result<Vec<String>> {
        let doc = HtmlDocument::parse(&page.body, &page.url)?;
        let links = doc.find_links();
        let extract = &self.config.extract;

        let Some(id) = doc.extract_identifier(&extract.id_selector, &extract.id_attribute) else {
            tracing::warn!("No identifier on {}; record skipped", url);
            return Ok(links);
        };

        let Some(body) = doc.extract_target_field(
            &extract.body_tag,
            &extract.body_selector,
            inner_tag(&extract.body_inner_tag),
        ) else {
            tracing::warn!("No body on {} ({}); record skipped", url, id);
            return Ok(links);
        };

        let label = doc
            .extract_target_field(
                &extract.label_tag,
                &extract.label_selector,
                inner_tag(&extract.label_inner_tag),
            )
            .map(|label| label.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();

        let raw = extract.store_raw.then_some(page.body.as_str());

        match self.store.put(&id, &label, &normalize_text(&body), raw) {
            Ok(()) => {
                summary.records_stored += 1;
                tracing::info!("Stored {} [{}] from {}", id, label, url);
            }
            Err(StorageError::InvalidRecord(reason)) => {
                tracing::warn!("Record from {} rejected: {}", url, reason);
            }
            Err(e) => return Err(e.into()),
        }

        Ok(links)
    }

    /// Writes the frontier to the checkpoint path
    pub fn checkpoint(&self) -> Result<()> {
        save_checkpoint(&self.frontier, &self.checkpoint_path)?;
        tracing::info!(
            "Checkpoint saved: {} URLs, {} crawled",
            self.frontier.len_all(),
            self.frontier.len_crawled()
        );
        Ok(())
    }
}

/// Builds an empty frontier from the configured rules and seeds it
fn seeded_frontier(config: &Config) -> Result<Frontier> {
    let mut frontier = Frontier::new(UrlRules::from_config(&config.crawler)?);

    for seed in &config.crawler.seeds {
        if !frontier.add_seed(seed) {
            tracing::warn!("Seed {} rejected by the URL rules", seed);
        }
    }

    tracing::info!("Seeded frontier with {} URLs", frontier.len_all());
    Ok(frontier)
}

/// An empty inner tag selects the element's own text
fn inner_tag(tag: &Option<String>) -> Option<&str> {
    tag.as_deref().filter(|t| !t.is_empty())
}

/// Runs a complete crawl operation
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Ignore a saved checkpoint
pub async fn run_crawl(config: Config, fresh: bool) -> Result<CrawlSummary> {
    let mut coordinator = Coordinator::new(config, fresh)?;
    coordinator.run().await
}
