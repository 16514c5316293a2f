//! Data models for scraped quotes.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Source`]: The closed set of supported quote sites
//! - [`QuoteRecord`]: One extracted quote, the unit of the output dataset
//! - [`Topic`]: One entry of a site's topic index
//!
//! It also owns [`record_id`], the content-addressed identity of a record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Author used when a page does not attribute a quote.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// A supported quote site.
///
/// The set is fixed; each variant selects its own URL layout and extractor
/// (see [`crate::scrapers::Site`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// azquotes.com, paginated topic listings.
    Azquotes,
    /// goodreads.com, paginated tag listings.
    Goodreads,
    /// famousquotesandauthors.com, one page per topic.
    Famousquotes,
}

impl Source {
    /// Identifier written to the `source` field and mixed into record ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Azquotes => "azquotes",
            Source::Goodreads => "goodreads",
            Source::Famousquotes => "famousquotes",
        }
    }

    /// Whether listings for this source are split across numbered pages.
    pub fn is_paginated(&self) -> bool {
        !matches!(self, Source::Famousquotes)
    }

    /// Production base URL of the site.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Source::Azquotes => "https://www.azquotes.com",
            Source::Goodreads => "https://www.goodreads.com",
            Source::Famousquotes => "http://www.famousquotesandauthors.com",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One quote extracted from a listing page.
///
/// Serialized as one line of the JSONL dataset. `likes` and `tags` are always
/// present; `lang` is omitted unless set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    /// Content-addressed id, see [`record_id`].
    pub id: String,
    /// The quote text, never blank.
    pub quote: String,
    /// Attribution, [`UNKNOWN_AUTHOR`] when the page has none.
    pub author: String,
    /// Tags in page order. Free-form tags or a single page topic.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Like count, 0 when the site gives no signal.
    pub likes: u64,
    pub source: Source,
    /// Absolute URL the quote was taken from.
    pub source_url: String,
    /// When the page was extracted; shared by every record of a page.
    pub scraped_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl QuoteRecord {
    /// Build a record, or `None` if the quote is blank.
    ///
    /// Trims the quote and author, substitutes [`UNKNOWN_AUTHOR`] for a blank
    /// author and computes the id.
    pub fn build(
        quote: &str,
        author: Option<&str>,
        tags: Vec<String>,
        likes: u64,
        source: Source,
        source_url: String,
        scraped_at: DateTime<Utc>,
    ) -> Option<Self> {
        let quote = quote.trim();
        if quote.is_empty() {
            return None;
        }
        let author = author
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR);

        Some(QuoteRecord {
            id: record_id(quote, author, source),
            quote: quote.to_string(),
            author: author.to_string(),
            tags,
            likes,
            source,
            source_url,
            scraped_at,
            lang: None,
        })
    }
}

/// Deterministic id of a quote: SHA-256 over
/// `lower(quote) | lower(author) | source`, as 64 lowercase hex characters.
///
/// Stable across runs and platforms; it is the dataset's dedup key.
pub fn record_id(quote: &str, author: &str, source: Source) -> String {
    let mut hasher = Sha256::new();
    hasher.update(quote.to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(author.to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(source.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One topic listed on a site's topic index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Display name as shown on the index.
    pub name: String,
    /// Value to pass to `--topic` for this site.
    pub slug: String,
    /// Absolute URL of the topic's first listing page.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(quote: &str, author: Option<&str>) -> Option<QuoteRecord> {
        QuoteRecord::build(
            quote,
            author,
            vec![],
            0,
            Source::Azquotes,
            "https://www.azquotes.com/quote/1".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_record_id_is_stable() {
        let a = record_id("Be yourself.", "Oscar Wilde", Source::Azquotes);
        let b = record_id("Be yourself.", "Oscar Wilde", Source::Azquotes);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_record_id_ignores_case() {
        assert_eq!(
            record_id("Be Yourself.", "OSCAR WILDE", Source::Goodreads),
            record_id("be yourself.", "oscar wilde", Source::Goodreads)
        );
    }

    #[test]
    fn test_record_id_changes_with_each_input() {
        let base = record_id("Be yourself.", "Oscar Wilde", Source::Azquotes);
        assert_ne!(base, record_id("Be yourself!", "Oscar Wilde", Source::Azquotes));
        assert_ne!(base, record_id("Be yourself.", "Oscar Wild", Source::Azquotes));
        assert_ne!(base, record_id("Be yourself.", "Oscar Wilde", Source::Goodreads));
    }

    #[test]
    fn test_build_rejects_blank_quote() {
        assert!(sample("", Some("Someone")).is_none());
        assert!(sample("   \n\t ", Some("Someone")).is_none());
    }

    #[test]
    fn test_build_defaults_author() {
        assert_eq!(sample("A quote", None).unwrap().author, "Unknown");
        assert_eq!(sample("A quote", Some("   ")).unwrap().author, "Unknown");
    }

    #[test]
    fn test_build_trims_and_hashes_trimmed_text() {
        let rec = sample("  A quote  ", Some(" Someone ")).unwrap();
        assert_eq!(rec.quote, "A quote");
        assert_eq!(rec.author, "Someone");
        assert_eq!(rec.id, record_id("A quote", "Someone", Source::Azquotes));
    }

    #[test]
    fn test_serialization_shape() {
        let rec = sample("A quote", Some("Someone")).unwrap();
        let value: serde_json::Value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["source"], "azquotes");
        assert_eq!(value["likes"], 0);
        assert_eq!(value["tags"], serde_json::json!([]));
        assert!(value.get("lang").is_none());
        assert!(value["scraped_at"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_deserialization_round_trip() {
        let rec = sample("A quote", Some("Someone")).unwrap();
        let json = serde_json::to_string(&rec).unwrap();
        let back: QuoteRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn test_source_pagination() {
        assert!(Source::Azquotes.is_paginated());
        assert!(Source::Goodreads.is_paginated());
        assert!(!Source::Famousquotes.is_paginated());
    }
}
