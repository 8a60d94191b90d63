//! HTTP fetcher implementation
//!
//! This module performs every HTTP request of a crawl, one at a time, and
//! owns the failure taxonomy:
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 200 | Success |
//! | HTTP 429 | Transient: back off and retry |
//! | HTTP 5xx | Transient: back off and retry |
//! | Timeout | Transient: back off and retry |
//! | Truncated or malformed transfer | Transient: back off and retry |
//! | Other HTTP 4xx | Skipped: no document, crawl continues |
//! | Connection refused / DNS / TLS | Fatal |
//! | Any other status | Fatal |
//!
//! Transient failures are retried without an attempt limit; only the delay
//! grows (see [`Backoff`]).

use crate::config::FetcherConfig;
use crate::crawler::backoff::{Backoff, RetryPolicy};
use crate::{CrawlError, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// The page was fetched with HTTP 200
    Success(FetchedPage),

    /// The server answered with a client error; there is no document
    Skipped {
        /// The HTTP status code
        status_code: u16,
    },
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    /// Page body content
    pub body: String,
    /// Every backoff delay slept before the successful attempt
    pub backoff: Vec<Duration>,
}

/// How a response status is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Transient,
    Skip,
    Fatal,
}

/// Classifies an HTTP status code per the retry taxonomy
pub fn classify_status(status: StatusCode) -> StatusClass {
    if status == StatusCode::OK {
        StatusClass::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusClass::Transient
    } else if status.is_client_error() {
        StatusClass::Skip
    } else {
        StatusClass::Fatal
    }
}

/// Outcome of a single request attempt
enum Attempt {
    Done { url: String, body: String },
    Skip(u16),
    Transient(String),
    Fatal(CrawlError),
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use post_harvest::config::FetcherConfig;
/// use post_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Single-flight HTTP fetcher with transient-error retry
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher from the `[fetcher]` configuration section
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        Ok(Self::with_client(
            build_http_client(config)?,
            RetryPolicy::from_config(config)?,
        ))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches a URL, retrying transient failures until a definitive outcome
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResult::Success)` - HTTP 200 and a complete body
    /// * `Ok(FetchResult::Skipped)` - a non-retryable 4xx
    /// * `Err(CrawlError)` - a fatal status or transport failure
    pub async fn fetch(&self, url: &str) -> Result<FetchResult> {
        let mut backoff = Backoff::new(&self.policy);
        let mut slept = Vec::new();

        loop {
            match self.attempt(url).await {
                Attempt::Done { url: final_url, body } => {
                    tracing::debug!("Fetched {} ({} bytes)", final_url, body.len());
                    return Ok(FetchResult::Success(FetchedPage {
                        url: final_url,
                        body,
                        backoff: slept,
                    }));
                }
                Attempt::Skip(status_code) => {
                    tracing::warn!("Skipping {}: HTTP {}", url, status_code);
                    return Ok(FetchResult::Skipped { status_code });
                }
                Attempt::Transient(reason) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        "Transient failure for {}: {}; retrying in {:.1}s",
                        url,
                        reason,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    slept.push(delay);
                }
                Attempt::Fatal(error) => return Err(error),
            }
        }
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Attempt::Transient("request timeout".to_string()),
            Err(e) if e.is_connect() || e.is_builder() || e.is_redirect() => {
                return Attempt::Fatal(CrawlError::Http {
                    url: url.to_string(),
                    source: e,
                })
            }
            Err(e) => return Attempt::Transient(format!("transfer failed: {}", e)),
        };

        let status = response.status();
        match classify_status(status) {
            StatusClass::Success => {}
            StatusClass::Transient => return Attempt::Transient(format!("HTTP {}", status)),
            StatusClass::Skip => return Attempt::Skip(status.as_u16()),
            StatusClass::Fatal => {
                return Attempt::Fatal(CrawlError::UnexpectedStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                })
            }
        }

        let final_url = response.url().to_string();
        match response.text().await {
            Ok(body) => Attempt::Done {
                url: final_url,
                body,
            },
            Err(e) => Attempt::Transient(format!("truncated body: {}", e)),
        }
    }
}
