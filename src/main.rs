//! Wayback-Salvage main entry point
//!
//! This is the command-line interface for the Wayback-Salvage archive harvester.

use anyhow::Context;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use wayback_salvage::checkpoint::open_store;
use wayback_salvage::config::{load_config_with_hash, Config};
use wayback_salvage::output::{load_statistics, print_statistics};
use wayback_salvage::RunDriver;

/// Wayback-Salvage: a resumable web-archive harvester
///
/// Wayback-Salvage recovers the archived pages of a domain, extracts their
/// main content, converts it to Markdown and stores it locally. Progress is
/// checkpointed after every page, so an interrupted run resumes where it
/// stopped.
#[derive(Parser, Debug)]
#[command(name = "wayback-salvage")]
#[command(version = "1.0.0")]
#[command(about = "A resumable web-archive harvester", long_about = None)]
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

    /// Validate config and show the settings without touching the network
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the checkpoint and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Process at most this many URLs in this run
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(2);
        }
    };

    let result = if cli.dry_run {
        handle_dry_run(&config).map(|()| ExitCode::SUCCESS)
    } else if cli.stats {
        handle_stats(&config).map(|()| ExitCode::SUCCESS)
    } else {
        handle_run(config, cli.limit).await
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Loads the configuration and installs logging
///
/// The log file location comes from the configuration, so logging is set up
/// once the file has been parsed.
fn load(cli: &Cli) -> anyhow::Result<Config> {
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    setup_logging(cli.verbose, cli.quiet, config.output.log_file.as_deref())?;

    tracing::info!(
        "Configuration loaded from {} (hash: {})",
        cli.config.display(),
        config_hash
    );

    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wayback_salvage=info,warn"),
            1 => EnvFilter::new("wayback_salvage=debug,info"),
            2 => EnvFilter::new("wayback_salvage=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let file = match log_file {
        Some(path) => {
            let handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(handle)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to install the logging subscriber")?;

    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Wayback-Salvage Dry Run ===\n");

    println!("Archive:");
    println!("  Target domain: {}", config.archive.target_domain);
    println!("  CDX index: {}", config.archive.cdx_api_url);
    println!("  Replay base: {}", config.archive.wayback_base_url);
    println!("  Fallback discovery: {}", config.archive.memento_api_url);

    println!("\nRequests:");
    println!("  Delay: {}ms", config.requests.delay_ms);
    println!("  Attempts per request: {}", config.requests.max_retries);
    println!("  Index timeout: {}ms", config.requests.api_timeout_ms);
    println!("  Content timeout: {}ms", config.requests.content_timeout_ms);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nContent selectors: {}", config.content.selectors.join(", "));

    println!("\nAssets:");
    println!("  CSS: {}", config.assets.download_css);
    println!("  Images: {}", config.assets.download_images);
    println!("  Scripts: {}", config.assets.download_scripts);
    println!("  Layout: {:?}", config.assets.layout);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.output_dir.display());
    println!("  Save original HTML: {}", config.output.save_original_html);
    println!("  Rewrite asset links: {}", config.output.rewrite_asset_links);
    if let Some(log_file) = &config.output.log_file {
        println!("  Log file: {}", log_file.display());
    }

    println!("\nCheckpoint:");
    println!("  Backend: {:?}", config.checkpoint.backend);
    println!("  Path: {}", config.checkpoint.path.display());

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the checkpoint
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Checkpoint: {}\n", config.checkpoint.path.display());

    let store = open_store(&config.checkpoint).with_context(|| {
        format!(
            "Failed to open checkpoint {}",
            config.checkpoint.path.display()
        )
    })?;

    let stats = load_statistics(store.as_ref());
    print_statistics(&stats);

    Ok(())
}

/// Handles the main archive pass
///
/// Exit status is 0 when every processed URL reached Done and 1 when any
/// reached Failed.
async fn handle_run(config: Config, limit: Option<usize>) -> anyhow::Result<ExitCode> {
    tracing::info!("Harvesting {}", config.archive.target_domain);
    if let Some(limit) = limit {
        tracing::info!("Processing at most {} URLs", limit);
    }

    let mut driver = RunDriver::new(config)
        .context("Failed to initialize the run")?
        .with_limit(limit);

    let summary = driver.run().await.context("Archive run aborted")?;

    println!("=== Run Summary ===\n");
    println!("  Candidate URLs: {}", summary.total);
    println!("  Already done: {}", summary.skipped);
    println!("  Done: {}", summary.done);
    println!("  Failed: {}", summary.failed);
    for url in &summary.failed_urls {
        println!("    - {}", url);
    }

    if summary.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}
