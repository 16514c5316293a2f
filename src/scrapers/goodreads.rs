//! Goodreads tag listing scraper.
//!
//! Each `div.quote.mediumText` block keeps the author span and footer links
//! inside or next to the quote text node, so the quote is read by walking the
//! text node's children and skipping the author span, `a.smallText` links and
//! `<br>` elements.

use super::{resolve_href, slug_from_url};
use crate::models::{QuoteRecord, Source, Topic};
use crate::utils::leading_count;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

static BLOCK: Lazy<Selector> = Lazy::new(|| sel("div.quote.mediumText"));
static QUOTE_TEXT: Lazy<Selector> = Lazy::new(|| sel("div.quoteText"));
static AUTHOR: Lazy<Selector> = Lazy::new(|| sel("span.authorOrTitle"));
static LIKES_LINK: Lazy<Selector> = Lazy::new(|| sel("div.quoteFooter a.smallText"));
static TAG_LINK: Lazy<Selector> = Lazy::new(|| sel("div.quoteFooter a[href*='/quotes/tag/']"));
/// Elements inside `div.quoteText` that are not part of the quote.
static NOT_QUOTE: Lazy<Selector> = Lazy::new(|| sel("span.authorOrTitle, a.smallText, br"));
static TOPIC_LINK: Lazy<Selector> = Lazy::new(|| sel("li.greyText a"));

/// Attribution dash left between the quote and the author span.
const ATTRIBUTION_DASH: char = '\u{2015}';

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Listing page URL for a tag and page number.
pub fn page_url(base: &str, topic: &str, page: u32) -> String {
    format!("{base}/quotes/tag/{}?page={page}", urlencoding::encode(topic))
}

/// Extract every quote block of a listing page.
pub fn extract(document: &Html, page_url: &str, scraped_at: DateTime<Utc>) -> Vec<QuoteRecord> {
    document
        .select(&BLOCK)
        .filter_map(|block| extract_block(block, page_url, scraped_at))
        .collect()
}

fn extract_block(
    block: ElementRef<'_>,
    page_url: &str,
    scraped_at: DateTime<Utc>,
) -> Option<QuoteRecord> {
    let author = block.select(&AUTHOR).next().map(text_of);

    let quote = block
        .select(&QUOTE_TEXT)
        .next()
        .map(quote_text)
        .unwrap_or_default();

    let tags = block
        .select(&TAG_LINK)
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect();

    let likes = block
        .select(&LIKES_LINK)
        .next()
        .map(|a| leading_count(&text_of(a), &[',', '.']))
        .unwrap_or(0);

    QuoteRecord::build(
        &quote,
        author.as_deref(),
        tags,
        likes,
        Source::Goodreads,
        page_url.to_string(),
        scraped_at,
    )
}

/// Text of `div.quoteText` without the author, footer links and line breaks.
fn quote_text(node: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out.trim()
        .trim_end_matches(ATTRIBUTION_DASH)
        .trim()
        .to_string()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    if !NOT_QUOTE.matches(&child) {
                        collect_text(child, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// The quotes landing page lists the popular tags.
pub fn topic_index_urls(base: &str) -> Vec<String> {
    vec![format!("{base}/quotes")]
}

/// Popular tags listed on the quotes landing page.
pub fn extract_topics(document: &Html, base_url: &Url) -> Vec<Topic> {
    document
        .select(&TOPIC_LINK)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            if !href.contains("/quotes/tag/") {
                return None;
            }
            let url = resolve_href(base_url, href)?;
            let slug = slug_from_url(&url, "")?;
            let name = text_of(a);
            let name = if name.is_empty() { slug.clone() } else { name };
            Some(Topic { name, slug, url })
        })
        .collect()
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
