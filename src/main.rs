//! Gallery-Harvest main entry point
//!
//! This is the command-line interface for the Gallery-Harvest downloader.

use anyhow::Context;
use clap::Parser;
use gallery_harvest::config::{load_config_or_default, validate, Config};
use gallery_harvest::crawler::crawl;
use gallery_harvest::input::{load_seed_links, SeedLink};
use gallery_harvest::output::print_summary;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Gallery-Harvest: a paginated photo-gallery downloader
///
/// Reads category links from a CSV table (column `URL`), walks every category
/// and album page, and saves each image under
/// `<output>/<category>/<album>/<page>_<title>.jpg`.
#[derive(Parser, Debug)]
#[command(name = "gallery-harvest")]
#[command(version)]
#[command(about = "A paginated photo-gallery downloader", long_about = None)]
struct Cli {
    /// CSV table with a `URL` column listing category pages
    #[arg(value_name = "INPUT", default_value = "input.csv")]
    input: PathBuf,

    /// Path to an optional TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Output root folder (overrides `output.root`)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Number of parallel image downloads (overrides `download.workers`)
    #[arg(short, long)]
    workers: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and input, list the seeds, and exit without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_effective_config(&cli)?;

    tracing::info!("Reading seed links from: {}", cli.input.display());
    let seeds = match load_seed_links(&cli.input) {
        Ok(seeds) => seeds,
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e).context("cannot start without a seed table");
        }
    };
    tracing::info!("Loaded {} seed links", seeds.len());

    if cli.dry_run {
        handle_dry_run(&config, &seeds);
        return Ok(());
    }

    let stats = crawl(config, &seeds).await?;

    if !cli.quiet {
        print_summary(&stats);
    }

    if stats.has_failures() {
        tracing::warn!(
            "Harvest completed with {} skipped units; see the log above for details",
            stats.failures()
        );
    }
    tracing::info!("All images from all categories processed.");

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("gallery_harvest=info,warn"),
            1 => EnvFilter::new("gallery_harvest=debug,info"),
            2 => EnvFilter::new("gallery_harvest=trace,debug"),
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

/// Loads the configuration file (or defaults) and applies CLI overrides
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }

    let mut config = load_config_or_default(cli.config.as_deref()).map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Some(output) = &cli.output {
        config.output.root = output.display().to_string();
    }
    if let Some(workers) = cli.workers {
        config.download.workers = workers;
    }

    validate(&config).context("invalid command-line override")?;

    Ok(config)
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, seeds: &[SeedLink]) {
    println!("=== Gallery-Harvest Dry Run ===\n");

    println!("Page Fetching:");
    println!("  User agent: {}", config.http.user_agent);
    println!(
        "  Attempts: {} (backoff from {}ms, retried statuses {:?})",
        config.http.max_attempts, config.http.backoff_base_ms, config.http.retry_statuses
    );
    println!("  Page cap per listing: {}", config.http.max_pages);

    println!("\nDownloads:");
    println!("  Workers: {}", config.download.workers);
    println!(
        "  Attempts: {} ({}ms apart, {}s timeout)",
        config.download.max_attempts, config.download.retry_delay_ms, config.download.timeout_secs
    );
    println!(
        "  Referer: {}",
        config
            .download
            .referer
            .as_deref()
            .unwrap_or("<origin of each category>")
    );
    println!("  Skip existing: {}", config.download.skip_existing);

    println!("\nOutput:");
    println!("  Root: {}", config.output.root);
    println!("  Extension: .{}", config.output.extension);

    println!("\nSeeds ({}):", seeds.len());
    for seed in seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}
