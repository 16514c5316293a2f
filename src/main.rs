//! # quote_harvest
//!
//! A concurrent scraper that collects quotes from public quote sites and
//! writes them as a JSON Lines dataset for downstream classification and
//! generation models.
//!
//! ## Features
//!
//! - Scrapes AZQuotes, Goodreads and FamousQuotesAndAuthors topic listings
//! - Bounded parallelism with a shared connection pool
//! - Retries with exponential backoff, jitter and `Retry-After` support
//! - Content-addressed record ids, deduplicated within a run
//! - Topic discovery (`--list-topics`)
//! - Graceful cancellation on Ctrl-C (nothing is written)
//!
//! ## Usage
//!
//! ```sh
//! quote_harvest --site goodreads --topics love,life --start 1 --end 5 --out data/quotes.jsonl
//! ```
//!
//! ## Architecture
//!
//! 1. **Worklist**: Expand topics × pages into listing URLs
//! 2. **Fetching**: Download pages, at most `--workers` at a time
//! 3. **Extraction**: Parse each page into quote records
//! 4. **Output**: Deduplicate by id and write the JSONL dataset

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::error::Error;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod fetch;
mod models;
mod outputs;
mod pipeline;
mod scheduler;
mod scrapers;
#[cfg(test)]
mod testing;
mod utils;

use cli::Cli;
use config::Config;
use fetch::Fetcher;
use pipeline::{RunOptions, discover_topics};
use scrapers::Site;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    info!("quote_harvest starting up");

    let args = Cli::parse();
    let topics = args.topic_list();
    if topics.is_empty() && !args.list_topics {
        Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "at least one topic is required: pass --topic or --topics (or --list-topics)",
            )
            .exit();
    }
    debug!(site = %args.site, ?topics, start = args.start, end = args.end, workers = args.workers, "Parsed CLI arguments");

    let config = Config::load(args.config.as_deref()).inspect_err(|e| {
        error!(error = %e, "Failed to load configuration");
    })?;
    let site = Site::new(args.site, args.base_url.as_deref()).inspect_err(|e| {
        error!(error = %e, "Invalid base URL");
    })?;
    debug!(base_url = %site.base_url(), "Resolved site");
    let fetcher = Fetcher::new(&config.http).inspect_err(|e| {
        error!(error = %e, "Failed to build HTTP client");
    })?;

    // --- Cancellation on Ctrl-C ---
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; cancelling run");
                cancel.cancel();
            }
        });
    }

    if args.list_topics {
        let found = discover_topics(&site, &fetcher, usize::from(args.workers), &cancel)
            .await
            .inspect_err(|e| error!(error = %e, "Topic discovery failed"))?;
        let mut stdout = std::io::stdout().lock();
        for topic in &found {
            writeln!(stdout, "{}", serde_json::to_string(topic)?)?;
        }
        info!(count = found.len(), elapsed_ms = start_time.elapsed().as_millis(), "Listed topics");
        return Ok(());
    }

    let options = RunOptions {
        site,
        topics,
        start: args.start,
        end: args.end,
        out: args.out,
        workers: usize::from(args.workers),
    };
    if options.start > options.end {
        warn!(start = options.start, end = options.end, "Empty page range; nothing to scrape");
    }

    let summary = pipeline::run(&options, &fetcher, &cancel)
        .await
        .inspect_err(|e| error!(error = %e, "Run failed"))?;

    let elapsed = start_time.elapsed();
    info!(
        pages = summary.pages,
        scraped = summary.scraped,
        duplicates = summary.duplicates,
        written = summary.written,
        out = %summary.out.display(),
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}
