//! Clean-up pass over sealed records.
//!
//! Splits names such as `NameError名前が未定義` into the identifier and the
//! description text that leaked into the name, clears placeholder values, and
//! normalizes the concatenated description and example once more.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::keywords::strip_separators;
use crate::normalizer::Normalizer;
use crate::record::{Field, Record, append_joined};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessConfig {
    pub enabled: bool,
    /// Identifier pattern searched for inside the error name
    pub name_pattern: String,
    /// Whole-field values that mean "missing"
    pub placeholders: Vec<String>,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name_pattern: r"[A-Za-z]+(?:Error|Exception|Warning)".to_string(),
            placeholders: vec!["nan".to_string(), "None".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostProcessor {
    enabled: bool,
    name_pattern: Regex,
    placeholders: Vec<String>,
    normalizer: Normalizer,
}

impl PostProcessor {
    pub fn new(config: &PostProcessConfig, normalizer: Normalizer) -> Result<Self> {
        Ok(Self {
            enabled: config.enabled,
            name_pattern: Regex::new(&config.name_pattern)?,
            placeholders: config.placeholders.clone(),
            normalizer,
        })
    }

    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        if !self.enabled {
            return records;
        }
        records
            .into_iter()
            .filter_map(|record| self.process(record))
            .collect()
    }

    fn process(&self, mut record: Record) -> Option<Record> {
        self.split_name(&mut record);

        for field in Field::ALL {
            let value = record.get_mut(field);
            if self.placeholders.iter().any(|p| p == value.trim()) {
                value.clear();
            }
        }

        record.description = self.normalizer.normalize(&record.description);
        record.example = self.normalizer.normalize(&record.example);

        if record.error_name.is_empty() {
            log::warn!("Dropping record without a name after clean-up: {:?}", record);
            return None;
        }
        Some(record)
    }

    fn split_name(&self, record: &mut Record) {
        let Some(m) = self.name_pattern.find(&record.error_name) else {
            return;
        };
        let before = strip_separators(&record.error_name[..m.start()]);
        let after = strip_separators(&record.error_name[m.end()..]);
        if before.is_empty() && after.is_empty() {
            record.error_name = m.as_str().to_string();
            return;
        }

        let mut description = String::new();
        append_joined(&mut description, before);
        append_joined(&mut description, after);
        append_joined(&mut description, &record.description);
        log::debug!("Split {:?} into {:?}", record.error_name, m.as_str());

        record.error_name = m.as_str().to_string();
        record.description = description;
    }
}
