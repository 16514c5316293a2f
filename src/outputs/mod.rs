//! Output generation for the scraped dataset.
//!
//! # Submodules
//!
//! - [`jsonl`]: Writes the run's records as newline-delimited JSON
//!
//! # Output Structure
//!
//! ```text
//! data/
//! └── quotes.jsonl   # one QuoteRecord per line, order not significant
//! ```

pub mod jsonl;
