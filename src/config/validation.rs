use crate::config::types::{Config, CrawlerConfig, ExtractConfig, FetcherConfig, OutputConfig};
use crate::crawler::RetryPolicy;
use crate::frontier::is_section_marker;
use crate::url::UrlRules;
use crate::{ConfigError, ConfigResult};
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_extract_config(&config.extract)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the crawl rules, compiling every pattern once
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    let rules = UrlRules::from_config(config)
        .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "At least one seed URL is required".to_string(),
        ));
    }

    for seed in &config.seeds {
        Url::parse(seed).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e))
        })?;

        if rules.validate(seed).is_none() {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' is off-domain or rejected by the URL patterns",
                seed
            )));
        }
    }

    if config.excluded_params.iter().any(|p| p.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "excluded_params cannot contain empty names".to_string(),
        ));
    }

    // These lines delimit sections in the checkpoint file.
    if let Some(reserved) = config
        .excluded_params
        .iter()
        .find(|p| is_section_marker(p))
    {
        return Err(ConfigError::Validation(format!(
            "excluded_params cannot contain the reserved name '{}'",
            reserved
        )));
    }

    if config.checkpoint_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "checkpoint_interval_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the HTTP client and retry policy
fn validate_fetcher_config(config: &FetcherConfig) -> ConfigResult<()> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if !config.initial_backoff_secs.is_finite() || config.initial_backoff_secs <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "initial_backoff_secs must be positive, got {}",
            config.initial_backoff_secs
        )));
    }

    if !config.backoff_multiplier.is_finite() || config.backoff_multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_multiplier must be >= 1.0, got {}",
            config.backoff_multiplier
        )));
    }

    if !config.max_backoff_secs.is_finite() || config.max_backoff_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "max_backoff_secs must be >= 0, got {}",
            config.max_backoff_secs
        )));
    }

    RetryPolicy::from_config(config)?;

    Ok(())
}

/// Validates that every extraction selector parses
fn validate_extract_config(config: &ExtractConfig) -> ConfigResult<()> {
    validate_selector(&format!("{}{}", config.body_tag, config.body_selector))?;
    validate_selector(&format!("{}{}", config.label_tag, config.label_selector))?;
    validate_selector(&config.id_selector)?;

    for inner in [&config.body_inner_tag, &config.label_inner_tag]
        .into_iter()
        .flatten()
        .filter(|t| !t.is_empty())
    {
        validate_selector(inner)?;
    }

    if config.id_attribute.is_empty() {
        return Err(ConfigError::Validation(
            "id_attribute cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint_path cannot be empty".to_string(),
        ));
    }

    if config.content_dir.is_empty() {
        return Err(ConfigError::Validation(
            "content_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_selector(selector: &str) -> ConfigResult<()> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern(format!("Invalid selector '{}': {:?}", selector, e)))
}
