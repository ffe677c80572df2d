//! Fragments in, records out.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three columns of a glossary entry.
///
/// Declaration order is both the column order of the exported table and the
/// priority order used when a fragment contains keywords of several fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    ErrorName,
    Description,
    Example,
}

impl Field {
    /// All fields in column/priority order.
    pub const ALL: [Field; 3] = [Field::ErrorName, Field::Description, Field::Example];

    /// Canonical column name.
    pub fn column_name(self) -> &'static str {
        match self {
            Field::ErrorName => "ErrorName",
            Field::Description => "Description",
            Field::Example => "Example",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// A piece of recognized text, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Text as the recognizer returned it
    pub text: String,
    /// Recognizer confidence in percent, when available
    pub confidence: Option<f32>,
    /// 1-based page number
    pub page: usize,
    /// Position in the whole-document stream
    pub order: usize,
}

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
            page: 1,
            order: 0,
        }
    }
}

impl AsRef<str> for Fragment {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// A sealed glossary entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "ErrorName")]
    pub error_name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Example")]
    pub example: String,
}

impl Record {
    pub fn new(
        error_name: impl Into<String>,
        description: impl Into<String>,
        example: impl Into<String>,
    ) -> Self {
        Self {
            error_name: error_name.into(),
            description: description.into(),
            example: example.into(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::ErrorName => &self.error_name,
            Field::Description => &self.description,
            Field::Example => &self.example,
        }
    }

    pub(crate) fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::ErrorName => &mut self.error_name,
            Field::Description => &mut self.description,
            Field::Example => &mut self.example,
        }
    }

    /// Append `text` to `field`, space-joined. Empty text is ignored.
    pub(crate) fn append(&mut self, field: Field, text: &str) {
        append_joined(self.get_mut(field), text);
    }

    /// Column values in [`Field::ALL`] order.
    pub fn columns(&self) -> [&str; 3] {
        [&self.error_name, &self.description, &self.example]
    }
}

/// Append with a single joining space, never leaving a leading space.
pub(crate) fn append_joined(target: &mut String, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}
