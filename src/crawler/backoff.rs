//! Exponential backoff for transient fetch failures

use crate::config::FetcherConfig;
use crate::{ConfigError, ConfigResult};
use std::time::Duration;

/// How long to wait between attempts after a transient failure
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Factor applied to the delay after every retry
    pub multiplier: f64,
    /// Upper bound for any single delay; `None` lets it grow without limit
    pub max_delay: Option<Duration>,
}

impl RetryPolicy {
    /// Builds the policy from the `[fetcher]` section
    ///
    /// Fails if a delay is negative, not finite, or too large for a `Duration`.
    pub fn from_config(config: &FetcherConfig) -> ConfigResult<Self> {
        let max_delay = if config.max_backoff_secs > 0.0 {
            Some(seconds("max-backoff-secs", config.max_backoff_secs)?)
        } else {
            None
        };

        Ok(Self {
            initial_delay: seconds("initial-backoff-secs", config.initial_backoff_secs)?,
            multiplier: config.backoff_multiplier,
            max_delay,
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            multiplier: 1.5,
            max_delay: Some(Duration::from_secs(300)),
        }
    }
}

fn seconds(key: &str, value: f64) -> ConfigResult<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| ConfigError::Validation(format!("{} = {} is out of range: {}", key, value, e)))
}

/// The delay sequence of one fetch
///
/// A fresh `Backoff` is created per URL, so a slow page does not inflate the
/// delays of the next one.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    multiplier: f64,
    max_delay: Option<Duration>,
}

impl Backoff {
    pub fn new(policy: &RetryPolicy) -> Self {
        let mut backoff = Self {
            next: policy.initial_delay,
            multiplier: policy.multiplier,
            max_delay: policy.max_delay,
        };
        backoff.next = backoff.cap(policy.initial_delay);
        backoff
    }

    /// Returns the delay to sleep now and advances the sequence
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        let grown = Duration::try_from_secs_f64(delay.as_secs_f64() * self.multiplier)
            .unwrap_or(Duration::MAX);
        self.next = self.cap(grown);
        delay
    }

    fn cap(&self, delay: Duration) -> Duration {
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}
