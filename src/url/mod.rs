//! URL handling module for Post-Harvest
//!
//! This module provides the classification rules the frontier applies to every
//! URL it sees: normalization relative to the base domain, the target-page
//! pattern, the general validity pattern and the exclusion pattern.

mod domain;
mod matcher;
mod normalize;

use crate::config::CrawlerConfig;
use crate::UrlResult;

// Re-export main types
pub use domain::BaseDomain;
pub use matcher::Pattern;
pub use normalize::normalize_url;

/// The immutable classification rules of one crawl
///
/// These are persisted in every checkpoint so a resumed run classifies URLs
/// exactly as the run that produced the saved state did.
#[derive(Debug, Clone)]
pub struct UrlRules {
    domain: BaseDomain,
    target: Pattern,
    valid: Pattern,
    exclude: Option<Pattern>,
    excluded_params: Vec<String>,
}

impl UrlRules {
    /// Builds the rules from their textual form
    ///
    /// An empty exclusion pattern means nothing is excluded.
    pub fn new(
        domain: &str,
        target_pattern: &str,
        all_pattern: &str,
        exclude_pattern: Option<&str>,
        excluded_params: Vec<String>,
    ) -> UrlResult<Self> {
        let exclude = match exclude_pattern {
            Some(p) if !p.is_empty() => Some(Pattern::new(p)?),
            _ => None,
        };

        Ok(Self {
            domain: BaseDomain::parse(domain)?,
            target: Pattern::new(target_pattern)?,
            valid: Pattern::new(all_pattern)?,
            exclude,
            excluded_params,
        })
    }

    /// Builds the rules from the `[crawler]` configuration section
    pub fn from_config(config: &CrawlerConfig) -> UrlResult<Self> {
        Self::new(
            &config.domain,
            &config.target_pattern,
            &config.all_pattern,
            config.exclude_pattern.as_deref(),
            config.excluded_params.clone(),
        )
    }

    /// Strips the domain prefix and excluded parameters; `None` off-domain
    pub fn normalize(&self, url: &str) -> Option<String> {
        normalize_url(&self.domain, &self.excluded_params, url)
    }

    /// `None` if off-domain, otherwise whether the URL is a target page
    pub fn is_target_page(&self, url: &str) -> Option<bool> {
        self.normalize(url)
            .map(|normalized| self.matches_target(&normalized))
    }

    /// Applies the target pattern to an already normalized URL
    pub fn matches_target(&self, normalized: &str) -> bool {
        self.target.is_match(normalized)
    }

    /// Normalizes and applies the validity and exclusion patterns
    pub fn validate(&self, url: &str) -> Option<String> {
        let normalized = self.normalize(url)?;

        if !self.valid.is_match(&normalized) {
            return None;
        }

        if let Some(exclude) = &self.exclude {
            if exclude.is_match(&normalized) {
                return None;
            }
        }

        Some(normalized)
    }

    /// Expands a normalized URL to absolute form
    pub fn absolute(&self, normalized: &str) -> String {
        self.domain.absolute(normalized)
    }

    pub fn domain(&self) -> &BaseDomain {
        &self.domain
    }

    pub fn target_pattern(&self) -> &str {
        self.target.as_str()
    }

    pub fn all_pattern(&self) -> &str {
        self.valid.as_str()
    }

    /// The exclusion pattern source, empty when nothing is excluded
    pub fn exclude_pattern(&self) -> &str {
        self.exclude.as_ref().map(Pattern::as_str).unwrap_or("")
    }

    pub fn excluded_params(&self) -> &[String] {
        &self.excluded_params
    }
}
