//! AZQuotes topic listing scraper.
//!
//! Listing pages (`/quotes/topics/{topic}.html?p={page}`) hold one
//! `div.wrap-block` per quote. Each block carries the quote link, the author,
//! free-form tag links and a heart counter with the like count.
//!
//! Quote links are usually relative (`/quote/123`); they are resolved against
//! the site's base URL so every record points at the quote's own page.

use super::{resolve_href, slug_from_url};
use crate::models::{QuoteRecord, Source, Topic};
use crate::utils::leading_count;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static BLOCK: Lazy<Selector> = Lazy::new(|| sel("div.wrap-block"));
static TITLE: Lazy<Selector> = Lazy::new(|| sel("a.title"));
static AUTHOR: Lazy<Selector> = Lazy::new(|| sel("div.author"));
static TAG_LINK: Lazy<Selector> = Lazy::new(|| sel("div.mytags a"));
static LIKES: Lazy<Selector> =
    Lazy::new(|| sel("div.share-icons a.heart24, div.share-icons a.heart24-off"));
static TOPIC_LINK: Lazy<Selector> = Lazy::new(|| sel("section.authors-page li a"));

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Listing page URL for a topic and page number.
pub fn page_url(base: &str, topic: &str, page: u32) -> String {
    format!(
        "{base}/quotes/topics/{}.html?p={page}",
        urlencoding::encode(topic)
    )
}

/// Extract every quote block of a listing page.
pub fn extract(
    document: &Html,
    page_url: &str,
    base_url: &Url,
    scraped_at: DateTime<Utc>,
) -> Vec<QuoteRecord> {
    document
        .select(&BLOCK)
        .filter_map(|block| extract_block(block, page_url, base_url, scraped_at))
        .collect()
}

fn extract_block(
    block: ElementRef<'_>,
    page_url: &str,
    base_url: &Url,
    scraped_at: DateTime<Utc>,
) -> Option<QuoteRecord> {
    let title = block.select(&TITLE).next();
    let quote = title.map(text_of).unwrap_or_default();
    let author = block.select(&AUTHOR).next().map(text_of);

    let tags = block
        .select(&TAG_LINK)
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect();

    let likes = block
        .select(&LIKES)
        .next()
        .map(|heart| leading_count(&text_of(heart), &[]))
        .unwrap_or(0);

    let source_url = title
        .and_then(|a| a.value().attr("href"))
        .filter(|href| !href.trim().is_empty())
        .and_then(|href| resolve_href(base_url, href))
        .unwrap_or_else(|| page_url.to_string());

    QuoteRecord::build(
        &quote,
        author.as_deref(),
        tags,
        likes,
        Source::Azquotes,
        source_url,
        scraped_at,
    )
}

/// Tag index pages, one per initial letter.
pub fn topic_index_urls(base: &str) -> Vec<String> {
    ('a'..='z')
        .map(|letter| format!("{base}/quotes/tags/{letter}/"))
        .collect()
}

/// Topics listed on one tag index page.
pub fn extract_topics(document: &Html, base_url: &Url) -> Vec<Topic> {
    document
        .select(&TOPIC_LINK)
        .filter_map(|a| {
            let name = text_of(a);
            let url = resolve_href(base_url, a.value().attr("href")?)?;
            let slug = slug_from_url(&url, ".html")?;
            (!name.is_empty()).then_some(Topic { name, slug, url })
        })
        .collect()
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
