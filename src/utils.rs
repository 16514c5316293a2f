//! Text helpers shared by the extractors and logging.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn normalize_spaces(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s.trim(), " ").into_owned()
}

/// Parse the leading whitespace-separated token of `text` as a count.
///
/// Characters in `separators` are removed from the token before parsing, so
/// `"1,234 likes"` with `&[',']` gives `1234`. Anything unparsable gives 0.
pub fn leading_count(text: &str, separators: &[char]) -> u64 {
    text.split_whitespace()
        .next()
        .map(|token| token.replace(separators, ""))
        .and_then(|token| token.parse().ok())
        .unwrap_or(0)
}
