//! Frontier: the URL classification and dedup state machine
//!
//! The frontier tracks three sets of normalized URLs:
//! - `all`: every valid URL ever seen as a link target
//! - `matching`: the subset of `all` that are target pages
//! - `crawled`: the subset of `all` whose outbound links have been absorbed
//!
//! `matching ⊆ all` and `crawled ⊆ all` hold at all times, including after a
//! checkpoint round-trip. A URL that fails validation never enters any set.

mod checkpoint;

pub use checkpoint::{
    backup_path, find_checkpoint, is_section_marker, load_checkpoint, save_checkpoint,
    CheckpointError,
};

use crate::crawler::{DocumentView, FetchResult, Fetcher, HtmlDocument};
use crate::url::UrlRules;
use crate::Result;
use std::collections::HashSet;

/// The crawl frontier
#[derive(Debug, Clone)]
pub struct Frontier {
    rules: UrlRules,
    all: HashSet<String>,
    matching: HashSet<String>,
    crawled: HashSet<String>,
}

impl Frontier {
    /// Creates an empty frontier governed by `rules`
    pub fn new(rules: UrlRules) -> Self {
        Self {
            rules,
            all: HashSet::new(),
            matching: HashSet::new(),
            crawled: HashSet::new(),
        }
    }

    pub fn rules(&self) -> &UrlRules {
        &self.rules
    }

    /// See [`UrlRules::normalize`]
    pub fn normalize(&self, url: &str) -> Option<String> {
        self.rules.normalize(url)
    }

    /// See [`UrlRules::is_target_page`]
    pub fn is_target_page(&self, url: &str) -> Option<bool> {
        self.rules.is_target_page(url)
    }

    /// See [`UrlRules::validate`]
    pub fn validate(&self, url: &str) -> Option<String> {
        self.rules.validate(url)
    }

    /// True if the URL can never be crawled or has been crawled already
    pub fn already_crawled(&self, url: &str) -> bool {
        match self.rules.validate(url) {
            Some(normalized) => self.crawled.contains(&normalized),
            None => true,
        }
    }

    /// Adds a start URL to `all` (and `matching`) without marking it crawled
    ///
    /// Returns true if the URL was new.
    pub fn add_seed(&mut self, url: &str) -> bool {
        self.absorb(url)
    }

    /// Marks `url` crawled and absorbs the links found on it
    ///
    /// No-op returning false if `url` is invalid or already crawled. Otherwise
    /// `url` and every link are folded through validation into `all` (and
    /// `matching` for target pages), and true is returned.
    pub fn record_visit(&mut self, url: &str, links: &[String]) -> bool {
        let Some(normalized) = self.rules.validate(url) else {
            return false;
        };

        if self.crawled.contains(&normalized) {
            return false;
        }

        self.insert_normalized(normalized.clone());
        self.crawled.insert(normalized);

        let discovered = links.iter().filter(|link| self.absorb(link)).count();
        tracing::debug!("Visited {}: {} new URLs", url, discovered);

        true
    }

    /// Records a visit for a page whose links are not known yet
    ///
    /// Fetches and parses the page only if it has not been crawled, so each URL
    /// is fetched at most once. A permanently skipped page is recorded with no
    /// links.
    pub async fn visit(&mut self, url: &str, fetcher: &Fetcher) -> Result<bool> {
        if self.already_crawled(url) {
            return Ok(false);
        }

        let links = match fetcher.fetch(url).await? {
            FetchResult::Success(page) => {
                HtmlDocument::parse(&page.body, &page.url)?.find_links()
            }
            FetchResult::Skipped { .. } => Vec::new(),
        };

        Ok(self.record_visit(url, &links))
    }

    /// The current `all` set in absolute form, sorted
    pub fn snapshot(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.all.iter().map(|u| self.rules.absolute(u)).collect();
        urls.sort();
        urls
    }

    pub fn len_all(&self) -> usize {
        self.all.len()
    }

    pub fn len_matching(&self) -> usize {
        self.matching.len()
    }

    pub fn len_crawled(&self) -> usize {
        self.crawled.len()
    }

    /// Target pages that have not been crawled yet
    pub fn pending_targets(&self) -> usize {
        self.matching.difference(&self.crawled).count()
    }

    /// Adds a URL to `all` (and `matching`), returning true if it was new
    fn absorb(&mut self, url: &str) -> bool {
        match self.rules.validate(url) {
            Some(normalized) => self.insert_normalized(normalized),
            None => false,
        }
    }

    /// Inserts an already validated URL without resolving it again
    fn insert_normalized(&mut self, normalized: String) -> bool {
        if self.rules.matches_target(&normalized) {
            self.matching.insert(normalized.clone());
        }

        self.all.insert(normalized)
    }
}
