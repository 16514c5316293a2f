//! Command-line interface definitions for quote_harvest.
//!
//! Arguments are parsed with `clap` derive; the config file path can also
//! come from the environment.

use crate::models::Source;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for quote_harvest.
///
/// At least one of `--topic` / `--topics` is needed unless `--list-topics`
/// is given; `main` reports the omission as a usage error.
///
/// # Examples
///
/// ```sh
/// # Pages 1-3 of two Goodreads tags, 4 pages in flight
/// quote_harvest --site goodreads --topics love,life --start 1 --end 3 --workers 4 --out data/goodreads.jsonl
///
/// # One FamousQuotes topic (single page, range ignored)
/// quote_harvest --site famousquotes --topic life
///
/// # Print the topics AZQuotes offers
/// quote_harvest --site azquotes --list-topics
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Site to scrape
    #[arg(short, long, value_enum, default_value_t = Source::Azquotes)]
    pub site: Source,

    /// First listing page (inclusive)
    #[arg(long, default_value_t = 1)]
    pub start: u32,

    /// Last listing page (inclusive)
    #[arg(long, default_value_t = 1)]
    pub end: u32,

    /// Output JSONL file
    #[arg(short, long, default_value = "data.jsonl")]
    pub out: PathBuf,

    /// Single topic to scrape
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Comma-separated topics to scrape (takes precedence over --topic)
    #[arg(long)]
    pub topics: Option<String>,

    /// Maximum pages fetched concurrently
    #[arg(short, long, default_value_t = 8, value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: u16,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "QUOTE_HARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Fetch from this base URL instead of the site's own (e.g. a mirror)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Print the site's topics as JSON lines instead of scraping
    #[arg(long)]
    pub list_topics: bool,
}

impl Cli {
    /// Topics to scrape: `--topics` split on commas, else `--topic`.
    ///
    /// Entries are trimmed and blanks dropped.
    pub fn topic_list(&self) -> Vec<String> {
        let raw = match (&self.topics, &self.topic) {
            (Some(list), _) => list.split(',').collect::<Vec<_>>(),
            (None, Some(one)) => vec![one.as_str()],
            (None, None) => Vec::new(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    }
}
