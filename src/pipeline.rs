//! End-to-end scrape runs.
//!
//! A run expands the requested topics and pages into a worklist, scrapes it
//! through [`run_bounded`], deduplicates the records by id and writes them
//! with [`write_jsonl`]. The same fetcher and scheduler also drive topic
//! discovery ([`discover_topics`]).

use crate::error::PipelineError;
use crate::fetch::Fetcher;
use crate::models::{QuoteRecord, Topic};
use crate::outputs::jsonl::write_jsonl;
use crate::scheduler::run_bounded;
use crate::scrapers::Site;
use itertools::Itertools;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// What to scrape and where to put it.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub site: Site,
    pub topics: Vec<String>,
    /// First page, inclusive.
    pub start: u32,
    /// Last page, inclusive.
    pub end: u32,
    pub out: PathBuf,
    /// Maximum pages in flight.
    pub workers: usize,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Listing pages in the worklist.
    pub pages: usize,
    /// Records extracted, duplicates included.
    pub scraped: usize,
    /// Records dropped because an earlier record had the same id.
    pub duplicates: usize,
    /// Records written to `out`.
    pub written: usize,
    pub out: PathBuf,
}

/// Listing URLs for every topic, and every page in `start..=end` when the
/// site is paginated. Single-page sites get one URL per topic.
///
/// `start > end` yields an empty worklist.
pub fn build_worklist(site: &Site, topics: &[String], start: u32, end: u32) -> Vec<String> {
    if start > end {
        return Vec::new();
    }
    if !site.source().is_paginated() {
        return topics.iter().map(|topic| site.page_url(topic, start)).collect();
    }
    topics
        .iter()
        .cartesian_product(start..=end)
        .map(|(topic, page)| site.page_url(topic, page))
        .collect()
}

/// Scrape everything `options` describes and write the dataset.
///
/// Pages that fail are logged and skipped; only cancellation and sink
/// failures end the run with an error. Nothing is written when cancelled.
#[instrument(level = "info", skip_all, fields(source = %options.site.source(), out = %options.out.display()))]
pub async fn run(
    options: &RunOptions,
    fetcher: &Fetcher,
    cancel: &CancellationToken,
) -> Result<RunSummary, PipelineError> {
    let t0 = Instant::now();
    let worklist = build_worklist(&options.site, &options.topics, options.start, options.end);
    let pages = worklist.len();
    info!(
        pages,
        topics = options.topics.len(),
        start = options.start,
        end = options.end,
        workers = options.workers,
        "Starting scrape"
    );

    let handler = {
        let site = Arc::new(options.site.clone());
        let fetcher = fetcher.clone();
        let cancel = cancel.clone();
        move |url: String| {
            let site = Arc::clone(&site);
            let fetcher = fetcher.clone();
            let cancel = cancel.clone();
            async move { site.scrape_page(&fetcher, &url, &cancel).await }
        }
    };
    let scraped: Vec<QuoteRecord> = run_bounded(worklist, options.workers, cancel, handler).await?;

    let total = scraped.len();
    let records: Vec<QuoteRecord> = scraped.into_iter().unique_by(|r| r.id.clone()).collect();
    let duplicates = total - records.len();

    let written = write_jsonl(&options.out, &records).await?;
    let summary = RunSummary {
        pages,
        scraped: total,
        duplicates,
        written,
        out: options.out.clone(),
    };
    info!(
        pages,
        scraped = total,
        duplicates,
        written,
        elapsed_ms = t0.elapsed().as_millis(),
        "Scrape complete"
    );
    Ok(summary)
}

/// Fetch the site's topic index pages and list the topics found.
///
/// Topics are unique by slug and sorted by slug.
#[instrument(level = "info", skip_all, fields(source = %site.source()))]
pub async fn discover_topics(
    site: &Site,
    fetcher: &Fetcher,
    workers: usize,
    cancel: &CancellationToken,
) -> Result<Vec<Topic>, PipelineError> {
    let handler = {
        let site = Arc::new(site.clone());
        let fetcher = fetcher.clone();
        let cancel = cancel.clone();
        move |url: String| {
            let site = Arc::clone(&site);
            let fetcher = fetcher.clone();
            let cancel = cancel.clone();
            async move { site.scrape_topics(&fetcher, &url, &cancel).await }
        }
    };
    let found = run_bounded(site.topic_index_urls(), workers, cancel, handler).await?;

    let topics: Vec<Topic> = found
        .into_iter()
        .unique_by(|t| t.slug.clone())
        .sorted_by(|a, b| a.slug.cmp(&b.slug))
        .collect();
    info!(count = topics.len(), "Discovered topics");
    Ok(topics)
}
