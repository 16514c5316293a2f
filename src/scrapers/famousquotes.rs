//! FamousQuotesAndAuthors topic page scraper.
//!
//! One page per topic, no pagination. The page has no per-quote container:
//! quote divs and author divs are siblings inside one content cell, so the
//! two lists are read separately and paired by position. Blank quote divs are
//! skipped before pairing. This relies on the page listing exactly one author
//! link per non-blank quote; a page that breaks that layout yields mispaired
//! records rather than an error.

use super::{resolve_href, slug_from_url};
use crate::models::{QuoteRecord, Source, Topic};
use crate::utils::normalize_spaces;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static CONTENT_CELL: Lazy<Selector> =
    Lazy::new(|| sel(r#"td[style="padding-left:16px; padding-right:16px;"][valign="top"]"#));
static FALLBACK_CELL: Lazy<Selector> = Lazy::new(|| sel(r#"td[valign="top"]"#));
static FALLBACK_MARKER: Lazy<Selector> = Lazy::new(|| sel(r#"div[style*="font-size:12px"]"#));
static HEADER: Lazy<Selector> =
    Lazy::new(|| sel(r#"div[style*="font-size:19px"][style*="Times New Roman"]"#));
static QUOTE: Lazy<Selector> = Lazy::new(|| sel(r#"div[style="font-size:12px;font-family:Arial;"]"#));
static AUTHOR_LINK: Lazy<Selector> = Lazy::new(|| sel(r#"div[style="padding-top:2px;"] a"#));
static TOPIC_LINK: Lazy<Selector> = Lazy::new(|| sel(r#"tr[height="14"] a"#));

const TOPIC_SUFFIX: &str = "_quotes.html";

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Topic page URL. The site has a single page per topic.
pub fn page_url(base: &str, topic: &str) -> String {
    format!("{base}/topics/{}{TOPIC_SUFFIX}", urlencoding::encode(topic))
}

/// Extract the quotes of a topic page, tagged with the page's topic.
pub fn extract(document: &Html, page_url: &str, scraped_at: DateTime<Utc>) -> Vec<QuoteRecord> {
    let Some(cell) = content_cell(document) else {
        return Vec::new();
    };

    let tags: Vec<String> = cell
        .select(&HEADER)
        .next()
        .map(|header| topic_from_header(&text_of(header)))
        .filter(|tag| !tag.is_empty())
        .into_iter()
        .collect();

    let quotes: Vec<String> = cell
        .select(&QUOTE)
        .map(|q| normalize_spaces(&text_of(q)))
        .filter(|q| !q.is_empty())
        .collect();
    let authors: Vec<String> = cell.select(&AUTHOR_LINK).map(text_of).collect();

    quotes
        .iter()
        .zip(authors.iter())
        .filter_map(|(quote, author)| {
            QuoteRecord::build(
                quote,
                Some(author.as_str()),
                tags.clone(),
                0,
                Source::Famousquotes,
                page_url.to_string(),
                scraped_at,
            )
        })
        .collect()
}

/// The main content cell, or the first top-aligned cell holding quote divs.
fn content_cell(document: &Html) -> Option<ElementRef<'_>> {
    document.select(&CONTENT_CELL).next().or_else(|| {
        document
            .select(&FALLBACK_CELL)
            .find(|td| td.select(&FALLBACK_MARKER).next().is_some())
    })
}

/// `"Life Quotes"` → `"Life"`; headers without the suffix are kept verbatim.
fn topic_from_header(header: &str) -> String {
    match header.find(" Quote") {
        Some(idx) if idx > 0 => header[..idx].trim().to_string(),
        _ => header.to_string(),
    }
}

/// The site-wide topic index.
pub fn topic_index_urls(base: &str) -> Vec<String> {
    vec![format!("{base}/quotes_by_topic.html")]
}

/// Topics listed on the topic index.
pub fn extract_topics(document: &Html, base_url: &Url) -> Vec<Topic> {
    document
        .select(&TOPIC_LINK)
        .filter_map(|a| {
            let name = text_of(a);
            let url = resolve_href(base_url, a.value().attr("href")?)?;
            let slug = slug_from_url(&url, TOPIC_SUFFIX)?;
            (!name.is_empty()).then_some(Topic { name, slug, url })
        })
        .collect()
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
