//! Post-Harvest main entry point
//!
//! This is the command-line interface for the Post-Harvest crawler.

use anyhow::Context;
use clap::Parser;
use post_harvest::config::{load_config_with_hash, Config};
use post_harvest::crawler::run_crawl;
use post_harvest::frontier::{find_checkpoint, load_checkpoint};
use post_harvest::output::{load_preview, load_statistics, print_preview, print_statistics};
use post_harvest::storage::open_existing_store;
use post_harvest::url::UrlRules;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Post-Harvest: a resumable single-site post crawler
///
/// Post-Harvest walks one site, stores the label and text of every page
/// matching the target pattern, and checkpoints its frontier so an
/// interrupted crawl picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "post-harvest")]
#[command(version)]
#[command(about = "A resumable single-site post crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a fresh crawl from the configured seeds, ignoring the checkpoint
    ///
    /// Without this flag a saved checkpoint is resumed.
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "preview"])]
    dry_run: bool,

    /// Show statistics from the checkpoint and content store and exit
    #[arg(long, conflicts_with_all = ["dry_run", "preview"])]
    stats: bool,

    /// List stored records and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    preview: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        print_statistics(&load_statistics(&config)?);
    } else if cli.preview {
        handle_preview(&config)?;
    } else {
        handle_crawl(config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("post_harvest=info,warn"),
            1 => EnvFilter::new("post_harvest=debug,info"),
            2 => EnvFilter::new("post_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Post-Harvest Dry Run ===\n");

    let crawler = &config.crawler;
    println!("Site:");
    println!("  Domain: {}", crawler.domain);
    println!("  Target pattern: {}", crawler.target_pattern);
    println!("  Valid pattern: {}", crawler.all_pattern);
    println!(
        "  Exclude pattern: {}",
        crawler.exclude_pattern.as_deref().unwrap_or("(none)")
    );
    println!("  Stripped query params: {:?}", crawler.excluded_params);
    println!("  Checkpoint every {}s", crawler.checkpoint_interval_secs);

    println!("\nFetcher:");
    println!("  User agent: {}", config.fetcher.user_agent);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!(
        "  Backoff: {}s x{} (cap {})",
        config.fetcher.initial_backoff_secs,
        config.fetcher.backoff_multiplier,
        if config.fetcher.max_backoff_secs > 0.0 {
            format!("{}s", config.fetcher.max_backoff_secs)
        } else {
            "none".to_string()
        }
    );

    println!("\nOutput:");
    println!("  Checkpoint: {}", config.output.checkpoint_path);
    println!(
        "  Content: {} ({:?})",
        config.output.content_dir, config.output.backend
    );

    let rules = UrlRules::from_config(crawler)?;
    println!("\nSeeds ({}):", crawler.seeds.len());
    for seed in &crawler.seeds {
        match rules.validate(seed) {
            Some(normalized) => {
                let kind = if rules.is_target_page(seed) == Some(true) {
                    "target"
                } else {
                    "listing"
                };
                println!("  * {} -> {} ({})", seed, normalized, kind);
            }
            None => println!("  * {} (rejected by the URL rules)", seed),
        }
    }

    println!("\n✓ Configuration is valid");

    let checkpoint_path = Path::new(&config.output.checkpoint_path);
    if let Some(saved) = find_checkpoint(checkpoint_path) {
        let frontier = load_checkpoint(&saved)
            .with_context(|| format!("Checkpoint {} is unreadable", saved.display()))?;
        println!(
            "✓ Would resume with {} URLs ({} crawled, {} target pages pending)",
            frontier.len_all(),
            frontier.len_crawled(),
            frontier.pending_targets()
        );
    } else {
        println!(
            "✓ Would start crawling with {} seed URLs",
            crawler.seeds.len()
        );
    }

    Ok(())
}

/// Handles the --preview mode: lists every stored record
fn handle_preview(config: &Config) -> anyhow::Result<()> {
    let content_dir = Path::new(&config.output.content_dir);
    println!("Content: {}\n", content_dir.display());

    match open_existing_store(config.output.backend, content_dir)? {
        Some(store) => print_preview(&load_preview(store.as_ref())?),
        None => println!("No records stored yet"),
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring saved checkpoint)");
    } else {
        tracing::info!("Starting crawl (will resume from checkpoint if one exists)");
    }

    tracing::info!(
        "Domain: {}, seeds: {}",
        config.crawler.domain,
        config.crawler.seeds.len()
    );

    match run_crawl(config, fresh).await {
        Ok(summary) => {
            tracing::info!(
                "Crawl completed successfully: {} URLs seen, {} crawled, {} records stored",
                summary.urls_seen,
                summary.urls_crawled,
                summary.records_stored
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
