//! Devread crawler main entry point
//!
//! This is the command-line interface for the devread blog post crawler.

use anyhow::{bail, Context};
use clap::Parser;
use devread_crawler::config::{load_config_with_hash, Config, PaginationConfig, SiteConfig};
use devread_crawler::crawler::{crawl_site, RunSummary};
use devread_crawler::storage::{RunStatus, SqlitePostRepository};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Devread crawler: idempotent blog post ingestion
///
/// Crawls the paginated listings of every configured site and stores the
/// posts found there. Re-running a crawl only writes what changed.
#[derive(Parser, Debug)]
#[command(name = "devread-crawler")]
#[command(version = "1.0.0")]
#[command(about = "Idempotent blog post crawler", long_about = None)]
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

    /// Only crawl the named site
    #[arg(long, value_name = "NAME")]
    site: Option<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let sites = select_sites(&config, cli.site.as_deref())?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, &sites);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(&config, &sites, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("devread_crawler=info,warn"),
            1 => EnvFilter::new("devread_crawler=debug,info"),
            2 => EnvFilter::new("devread_crawler=trace,debug"),
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

/// Resolves `--site` against the configured sites
fn select_sites<'a>(
    config: &'a Config,
    name: Option<&str>,
) -> anyhow::Result<Vec<&'a SiteConfig>> {
    match name {
        Some(name) => match config.site(name) {
            Some(site) => Ok(vec![site]),
            None => bail!("no site named '{}' in configuration", name),
        },
        None => Ok(config.sites.iter().collect()),
    }
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, sites: &[&SiteConfig]) {
    println!("=== Devread Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Page concurrency: {}", config.crawler.page_concurrency());
    println!("  Workers per page: {}", config.crawler.worker_count());
    println!("  Queue capacity: {}", config.crawler.queue_capacity());

    println!("\nFetcher:");
    println!("  Initial retry delay: {:?}", config.fetcher.initial_interval());
    println!("  Multiplier: {}", config.fetcher.multiplier);
    println!("  Max retry delay: {:?}", config.fetcher.max_interval());
    match config.fetcher.max_attempts {
        Some(n) => println!("  Max attempts: {}", n),
        None => println!("  Max attempts: unbounded"),
    }
    println!("  Request timeout: {:?}", config.fetcher.timeout());

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nSites ({}):", sites.len());
    for site in sites {
        match &site.pagination {
            PaginationConfig::FixedRange { pages } => {
                println!("  - {} ({} pages)", site.name, pages);
                println!("    * {}", site.page_url_for(1));
                if *pages > 1 {
                    println!("    * ... {}", site.page_url_for(*pages));
                }
            }
            PaginationConfig::LinkFollowing { next_selector } => {
                println!("  - {} (following '{}')", site.name, next_selector);
                println!("    * {}", site.page_url_for(1));
            }
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let repository = SqlitePostRepository::new(Path::new(&config.storage.database_path))
        .context("failed to open database")?;

    println!("Posts: {}", repository.count_posts()?);

    let tags = repository.count_posts_by_tag()?;
    if !tags.is_empty() {
        println!("\nBy tag:");
        for (tag, count) in tags {
            let tag = if tag.is_empty() { "(untagged)" } else { tag.as_str() };
            println!("  {:>6}  {}", count, tag);
        }
    }

    println!("\nLatest runs:");
    for site in &config.sites {
        match repository.get_latest_run(&site.name)? {
            Some(run) => println!(
                "  {}: {} at {} ({} created, {} updated, {} unchanged, {} failed)",
                site.name,
                run.status.to_db_string(),
                run.finished_at.as_deref().unwrap_or(&run.started_at),
                run.posts_created,
                run.posts_updated,
                run.posts_unchanged,
                run.posts_failed
            ),
            None => println!("  {}: never crawled", site.name),
        }
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    sites: &[&SiteConfig],
    config_hash: &str,
) -> anyhow::Result<()> {
    let repository = Arc::new(
        SqlitePostRepository::new(Path::new(&config.storage.database_path))
            .context("failed to open database")?,
    );

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let mut total = RunSummary::default();
    let mut failed_sites = 0;

    for site in sites {
        if cancel.is_cancelled() {
            tracing::warn!("Interrupted; not starting site {}", site.name);
            break;
        }

        let run_id = repository.create_run(&site.name, config_hash)?;
        let result = crawl_site(site, config, repository.clone(), cancel.clone()).await;

        match result {
            Ok(summary) => {
                let status = if cancel.is_cancelled() {
                    RunStatus::Interrupted
                } else {
                    RunStatus::Completed
                };
                repository.complete_run(run_id, status, &summary)?;
                total.merge(&summary);
            }
            Err(e) => {
                tracing::error!("Crawl of {} failed: {}", site.name, e);
                repository.complete_run(run_id, RunStatus::Failed, &RunSummary::default())?;
                failed_sites += 1;
            }
        }
    }

    tracing::info!("Crawl finished: {}", total);
    if failed_sites > 0 {
        bail!("{} of {} sites failed", failed_sites, sites.len());
    }
    Ok(())
}

/// Cancels `cancel` on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received; finishing in-flight pages");
                cancel.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for interrupt: {}", e),
        }
    });
}
