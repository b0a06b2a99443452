//! # Football History
//!
//! Scrapes league fixtures tables (FBref by default) into raw CSV files and
//! normalizes them into analysis-ready processed CSV files.
//!
//! ## Usage
//!
//! ```sh
//! football_history scrape --all --historical
//! football_history process --all
//! ```
//!
//! ## Architecture
//!
//! Two independent pipelines share one YAML configuration:
//! 1. **Scrape**: resolve league URLs, fetch each page with retry, extract the
//!    fixtures table and save it under the raw directory
//! 2. **Process**: load raw files, drop/split/normalize/coerce/reorder columns
//!    and write `*-processed.csv` files
//!
//! Each run walks its items one at a time and ends with an
//! attempted/succeeded/failed summary; one failing item never stops the rest.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod errors;
mod http;
mod models;
mod outputs;
mod processing;
mod scrapers;
mod summary;
mod utils;

use cli::{Cli, Command, ProcessArgs, ScrapeArgs};
use config::Config;
use http::{HttpSource, RetryPolicy, RetryingSource, TokioSleeper};
use processing::cleaner::Cleaner;
use processing::normalizer::TeamNameNormalizer;
use processing::orchestrator::ProcessOrchestrator;
use scrapers::fetcher::TableFetcher;
use scrapers::orchestrator::ScrapeOrchestrator;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    // --- Tracing init ---
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("football_history starting up");
    debug!(?args, "Parsed CLI arguments");

    let config = Config::load(&args.config).await?;

    let failed = match &args.command {
        Command::Scrape(scrape) => run_scrape(&config, scrape).await?,
        Command::Process(process) => run_process(&config, process, args.verbose).await?,
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    if failed > 0 {
        return Err(format!("{failed} item(s) failed").into());
    }
    Ok(())
}

/// Returns the number of failed targets.
#[instrument(level = "info", skip_all)]
async fn run_scrape(config: &Config, args: &ScrapeArgs) -> Result<usize, Box<dyn Error>> {
    let save = !args.no_save;
    let raw_dir = config.paths.raw_dir.as_path();
    if save {
        check_output_dir(raw_dir).await?;
    }

    let source = RetryingSource::new(
        HttpSource::new(&config.http)?,
        RetryPolicy::from(&config.http.retry),
        TokioSleeper,
    );
    debug!(?source, "Built page source");
    let fetcher = TableFetcher::new(source, config.table.header_keywords.clone());
    let orchestrator = ScrapeOrchestrator::new(
        fetcher,
        config.leagues.clone(),
        config.historical.clone(),
        raw_dir.to_path_buf(),
    );

    let summary = orchestrator
        .run(&args.selection(), args.historical, save)
        .await;
    summary.log("Scrape");
    Ok(summary.failed())
}

/// Returns the number of failed files.
#[instrument(level = "info", skip_all)]
async fn run_process(
    config: &Config,
    args: &ProcessArgs,
    verbose: bool,
) -> Result<usize, Box<dyn Error>> {
    let processed_dir = config.paths.processed_dir.as_path();
    check_output_dir(processed_dir).await?;

    let cleaner = Cleaner::new(
        config.columns.clone(),
        TeamNameNormalizer::new(&config.team_name_corrections),
        processed_dir.to_path_buf(),
    )?;
    let orchestrator = ProcessOrchestrator::new(
        cleaner,
        config.paths.raw_dir.clone(),
        &config.files.file_pattern,
    )?;

    let selection = args.selection(config.files.process_all, &config.files.default_csv);
    let summary = orchestrator.run(&selection, verbose).await;
    summary.log("Process");
    Ok(summary.failed())
}

async fn check_output_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    if let Err(e) = ensure_writable_dir(path).await {
        error!(
            path = %path.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    Ok(())
}
