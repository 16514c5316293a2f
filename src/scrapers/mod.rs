//! Quote site scrapers.
//!
//! Each supported site has a submodule that knows its URL layout and markup:
//!
//! | Source | Module | Listing | Notes |
//! |--------|--------|---------|-------|
//! | AZQuotes | [`azquotes`] | paginated topics | likes from the heart counter |
//! | Goodreads | [`goodreads`] | paginated tags | author/footer stripped from quote text |
//! | FamousQuotesAndAuthors | [`famousquotes`] | one page per topic | quotes and authors paired by position |
//!
//! [`Site`] binds a [`Source`] to a base URL and dispatches to the matching
//! submodule, so callers never branch on the source themselves.
//!
//! # Common Patterns
//!
//! Each submodule exports:
//! - `page_url(...)`: the listing URL for a topic (and page)
//! - `extract(...)`: parsed document → `Vec<QuoteRecord>`
//! - `topic_index_urls(base)` / `extract_topics(...)`: topic discovery

pub mod azquotes;
pub mod famousquotes;
pub mod goodreads;

use crate::error::{FetchError, PipelineError};
use crate::fetch::Fetcher;
use crate::models::{QuoteRecord, Source, Topic};
use chrono::Utc;
use scraper::Html;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

/// A source together with the base URL its pages are fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    source: Source,
    base_url: Url,
}

impl Site {
    /// Site at its production address, or at `base_url` when given (e.g. a mirror).
    pub fn new(source: Source, base_url: Option<&str>) -> Result<Self, PipelineError> {
        let raw = base_url.unwrap_or(source.default_base_url());
        let base_url = Url::parse(raw).map_err(|e| PipelineError::BaseUrl {
            url: raw.to_string(),
            source: e,
        })?;
        Ok(Self { source, base_url })
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL without a trailing slash, ready for path templates.
    fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Listing URL for `topic`. `page` is ignored by single-page sources.
    pub fn page_url(&self, topic: &str, page: u32) -> String {
        match self.source {
            Source::Azquotes => azquotes::page_url(self.base(), topic, page),
            Source::Goodreads => goodreads::page_url(self.base(), topic, page),
            Source::Famousquotes => famousquotes::page_url(self.base(), topic),
        }
    }

    /// Extract the records of one fetched page.
    ///
    /// Every record of the page shares one `scraped_at` timestamp.
    pub fn extract(&self, body: &str, page_url: &str) -> Vec<QuoteRecord> {
        let document = Html::parse_document(body);
        let scraped_at = Utc::now();
        match self.source {
            Source::Azquotes => azquotes::extract(&document, page_url, &self.base_url, scraped_at),
            Source::Goodreads => goodreads::extract(&document, page_url, scraped_at),
            Source::Famousquotes => famousquotes::extract(&document, page_url, scraped_at),
        }
    }

    /// Fetch one listing page and extract its records.
    #[instrument(level = "info", skip(self, fetcher, cancel), fields(source = %self.source))]
    pub async fn scrape_page(
        &self,
        fetcher: &Fetcher,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<QuoteRecord>, FetchError> {
        let body = fetcher.get_with_retry(url, cancel).await?;
        let records = self.extract(&body, url);
        if records.is_empty() {
            warn!(%url, bytes = body.len(), "Page yielded no records");
        } else {
            debug!(%url, count = records.len(), "Extracted records");
        }
        Ok(records)
    }

    /// Pages that list this site's topics.
    pub fn topic_index_urls(&self) -> Vec<String> {
        match self.source {
            Source::Azquotes => azquotes::topic_index_urls(self.base()),
            Source::Goodreads => goodreads::topic_index_urls(self.base()),
            Source::Famousquotes => famousquotes::topic_index_urls(self.base()),
        }
    }

    /// Extract the topics listed on one topic index page.
    pub fn extract_topics(&self, body: &str) -> Vec<Topic> {
        let document = Html::parse_document(body);
        match self.source {
            Source::Azquotes => azquotes::extract_topics(&document, &self.base_url),
            Source::Goodreads => goodreads::extract_topics(&document, &self.base_url),
            Source::Famousquotes => famousquotes::extract_topics(&document, &self.base_url),
        }
    }

    /// Fetch one topic index page and extract its topics.
    #[instrument(level = "info", skip(self, fetcher, cancel), fields(source = %self.source))]
    pub async fn scrape_topics(
        &self,
        fetcher: &Fetcher,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Topic>, FetchError> {
        let body = fetcher.get_with_retry(url, cancel).await?;
        let topics = self.extract_topics(&body);
        if topics.is_empty() {
            warn!(%url, "Topic index yielded no topics");
        }
        Ok(topics)
    }
}

/// Absolute hrefs are kept as written; relative ones are joined onto `base`.
pub(crate) fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if Url::parse(href).is_ok() {
        return Some(href.to_string());
    }
    base.join(href).ok().map(String::from)
}

/// Last non-empty path segment of `url`, percent-decoded, minus `suffix`.
pub(crate) fn slug_from_url(url: &str, suffix: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let segment = segment.strip_suffix(suffix).unwrap_or(segment);
    let slug = urlencoding::decode(segment).ok()?.into_owned();
    (!slug.is_empty()).then_some(slug)
}
