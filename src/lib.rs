//! Rebuild "Error Name / Description / Example" glossary tables from scanned PDFs.
//!
//! OCR flattens a table into an ordered list of text fragments. This crate
//! repairs known misrecognitions in each fragment ([`normalizer`]) and then
//! walks the stream with a small state machine ([`segmenter`]) that uses
//! recurring header keywords to put every fragment back into its column.
//!
//! ```
//! use rust_ocr_glossary::{segment, Record};
//!
//! let records = segment([
//!     "ErrorName: SyntaxError",
//!     "Description: unexpected token",
//!     "Example: def f(:",
//! ]);
//! assert_eq!(records, vec![Record::new("SyntaxError", "unexpected token", "def f(:")]);
//! ```
//!
//! Rasterization and recognition are external tools behind the
//! [`ocr::Rasterizer`] and [`ocr::Recognizer`] traits; [`pipeline::Pipeline`]
//! wires them to the core and [`export`] writes the resulting table.

use lazy_static::lazy_static;

pub mod config;
pub mod error;
pub mod export;
pub mod keywords;
pub mod normalizer;
pub mod ocr;
pub mod pipeline;
pub mod postprocess;
pub mod record;
pub mod segmenter;

#[cfg(feature = "python")]
mod python;

pub use config::Config;
pub use error::{Error, Result};
pub use keywords::{KeywordTable, MatchOrder};
pub use normalizer::{Normalizer, ReplaceRule};
pub use pipeline::{Pipeline, Progress};
pub use postprocess::PostProcessor;
pub use record::{Field, Fragment, Record};
pub use segmenter::{SegmentCursor, SegmentState, Segmenter};

// Built once, shared by the convenience functions below
lazy_static! {
    static ref DEFAULT_SEGMENTER: Segmenter = Segmenter::default();
}

/// Normalize one fragment with the built-in repair table.
pub fn normalize(text: &str) -> String {
    DEFAULT_SEGMENTER.normalizer().normalize(text)
}

/// Segment a fragment stream with the built-in keyword table and policies.
pub fn segment<I, S>(fragments: I) -> Vec<Record>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    DEFAULT_SEGMENTER.segment(fragments)
}
