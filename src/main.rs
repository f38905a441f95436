//! Livetide main entry point
//!
//! This is the command-line interface for the Livetide crawler.

use clap::Parser;
use livetide::config::load_config;
use livetide::crawler::Coordinator;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Livetide: a live-streaming platform crawler
///
/// Livetide discovers channels and rooms on a streaming platform through
/// its JSON APIs, keeps their current state in a local SQLite database,
/// and appends timestamped snapshots for trend tracking.
#[derive(Parser, Debug)]
#[command(name = "livetide")]
#[command(version = "1.0.0")]
#[command(about = "A live-streaming platform crawler", long_about = None)]
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

    /// Discover channels and scan room lists without refreshing details
    #[arg(long, conflicts_with_all = ["stats", "dry_run"])]
    skip_details: bool,

    /// Only refresh details of currently open rooms
    #[arg(long, conflicts_with_all = ["stats", "dry_run", "skip_details"])]
    details_only: bool,

    /// Re-run the crawl every N seconds instead of exiting
    #[arg(long, value_name = "SECS", conflicts_with_all = ["stats", "dry_run"])]
    interval: Option<u64>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        let mode = if cli.details_only {
            CrawlMode::DetailsOnly
        } else if cli.skip_details {
            CrawlMode::SkipDetails
        } else {
            CrawlMode::Full
        };
        handle_crawl(config, mode, cli.interval).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("livetide=info,warn"),
            1 => EnvFilter::new("livetide=debug,info"),
            2 => EnvFilter::new("livetide=trace,debug"),
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
fn handle_dry_run(config: &livetide::Config) {
    println!("=== Livetide Dry Run ===\n");

    println!("Site:");
    println!("  Code: {}", config.site.code);
    println!("  Name: {}", config.site.name);
    println!("  URL: {}", config.site.url);
    println!("  Channel list: {}", config.site.channel_list_url);
    println!("  Room list: {}", config.site.room_list_url);
    println!("  Room detail: {}", config.site.room_detail_url);

    println!("\nCrawler:");
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Page limit: {}", config.crawler.page_limit);
    println!("  Fetch retries: {}", config.crawler.fetch_retries);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &livetide::Config) -> Result<(), Box<dyn std::error::Error>> {
    use livetide::output::{load_statistics, print_statistics};
    use livetide::storage::SqliteStorage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage, &config.site.code)?;
    print_statistics(&stats);

    Ok(())
}

/// Which parts of the crawl an invocation runs
#[derive(Debug, Clone, Copy)]
enum CrawlMode {
    Full,
    SkipDetails,
    DetailsOnly,
}

/// Handles the crawl operation, optionally re-running on a fixed timer
async fn handle_crawl(
    config: livetide::Config,
    mode: CrawlMode,
    interval: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut coordinator = Coordinator::new(config)?;

    loop {
        let result = match mode {
            CrawlMode::Full => coordinator.run_cycle().await,
            CrawlMode::SkipDetails => coordinator.run_list_cycle().await,
            CrawlMode::DetailsOnly => coordinator.run_detail_cycle().await,
        };

        match result {
            Ok(stats) => tracing::info!(
                "crawl finished: {} channels, {} rooms listed, {} rooms detailed, {} errors",
                stats.channels_scanned,
                stats.rooms_listed,
                stats.rooms_detailed,
                stats.errors
            ),
            Err(e) => {
                // On a timer a failed cycle just waits for the next tick.
                if interval.is_none() {
                    tracing::error!("Crawl failed: {}", e);
                    return Err(e.into());
                }
                tracing::error!("Crawl failed, will retry on next tick: {}", e);
            }
        }

        match interval {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => break,
        }
    }

    Ok(())
}
