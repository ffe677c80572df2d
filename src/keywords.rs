//! Header keyword table.
//!
//! Maps each [`Field`] to the spellings that announce it, including the
//! corrupted variants the normalizer does not repair. Matching is plain
//! substring containment on normalized text.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::record::Field;

lazy_static! {
    static ref ERROR_NAME_KEYWORDS: Vec<&'static str> =
        vec!["ErrorName", "Error Name", "エラー名", "工ラー名", "エラ一名"];
    static ref DESCRIPTION_KEYWORDS: Vec<&'static str> = vec!["Description", "説明", "說明"];
    static ref EXAMPLE_KEYWORDS: Vec<&'static str> = vec!["Example", "発生例", "生例"];
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// How to pick a field when a fragment contains keywords of several fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOrder {
    /// ErrorName, then Description, then Example
    #[default]
    Priority,
    /// The keyword that starts earliest in the fragment
    Position,
}

/// Keyword spellings per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub error_name: Vec<String>,
    pub description: Vec<String>,
    pub example: Vec<String>,
    pub match_order: MatchOrder,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            error_name: to_strings(&ERROR_NAME_KEYWORDS),
            description: to_strings(&DESCRIPTION_KEYWORDS),
            example: to_strings(&EXAMPLE_KEYWORDS),
            match_order: MatchOrder::Priority,
        }
    }
}

/// A header keyword found in a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMatch {
    pub field: Field,
    /// Byte range of the keyword in the fragment
    pub start: usize,
    pub end: usize,
}

impl HeaderMatch {
    /// The fragment with everything up to and including the keyword removed,
    /// along with the separators that follow it.
    pub fn remainder<'t>(&self, text: &'t str) -> &'t str {
        strip_separators(&text[self.end..])
    }
}

/// Leading colons, middle dots and whitespace.
pub fn strip_separators(text: &str) -> &str {
    text.trim_start_matches(|c: char| {
        matches!(c, ':' | '：' | '・' | '･' | '·') || c.is_whitespace()
    })
    .trim_end()
}

/// Compiled keyword table.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    variants: [Vec<String>; 3],
    order: MatchOrder,
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::new(&KeywordConfig::default())
    }
}

impl KeywordTable {
    pub fn new(config: &KeywordConfig) -> Self {
        let clean = |words: &[String]| {
            let mut out: Vec<String> = Vec::with_capacity(words.len());
            for word in words {
                if word.is_empty() || out.contains(word) {
                    continue;
                }
                out.push(word.clone());
            }
            out
        };
        let table = Self {
            variants: [
                clean(&config.error_name),
                clean(&config.description),
                clean(&config.example),
            ],
            order: config.match_order,
        };
        if table.variants(Field::ErrorName).is_empty() {
            log::warn!("No error-name keywords configured; every document will come back empty");
        }
        table
    }

    pub fn variants(&self, field: Field) -> &[String] {
        &self.variants[field as usize]
    }

    pub fn match_order(&self) -> MatchOrder {
        self.order
    }

    /// Earliest keyword of `field` in `text`; ties go to the longer spelling.
    fn find_field(&self, field: Field, text: &str) -> Option<HeaderMatch> {
        self.variants(field)
            .iter()
            .filter_map(|keyword| {
                text.find(keyword.as_str()).map(|start| HeaderMatch {
                    field,
                    start,
                    end: start + keyword.len(),
                })
            })
            .min_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)))
    }

    /// Decide whether `text` is a header fragment, and for which field.
    pub fn classify(&self, text: &str) -> Option<HeaderMatch> {
        match self.order {
            MatchOrder::Priority => Field::ALL
                .iter()
                .find_map(|&field| self.find_field(field, text)),
            MatchOrder::Position => Field::ALL
                .iter()
                .filter_map(|&field| self.find_field(field, text))
                .min_by_key(|m| (m.start, m.field)),
        }
    }
}
