//! Segmentation state machine.
//!
//! Rebuilds the "Error Name / Description / Example" table from the flat,
//! ordered fragment stream that OCR leaves behind. Header keywords switch the
//! active field; unlabeled fragments are appended to whichever field is
//! active. An error-name header seals the previous record, and the end of the
//! stream seals the last one. Nothing in here fails: odd input is absorbed
//! into the active field or, before the first record exists, skipped.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use whatlang::Script;

use crate::config::Config;
use crate::keywords::KeywordTable;
use crate::normalizer::Normalizer;
use crate::record::{Field, Record};

/// Scripts that mark a fragment as prose rather than an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProseScript {
    Hiragana,
    Katakana,
    Han,
    Hangul,
    Cyrillic,
    Latin,
}

impl ProseScript {
    fn script(self) -> Script {
        match self {
            ProseScript::Hiragana => Script::Hiragana,
            ProseScript::Katakana => Script::Katakana,
            ProseScript::Han => Script::Mandarin,
            ProseScript::Hangul => Script::Hangul,
            ProseScript::Cyrillic => Script::Cyrillic,
            ProseScript::Latin => Script::Latin,
        }
    }
}

/// When text after an error-name header is really the description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReclassifyConfig {
    pub enabled: bool,
    /// Fragments longer than this (in characters) are not part of a name
    pub max_name_chars: usize,
    /// Any character from these scripts marks the fragment as prose
    pub prose_scripts: Vec<ProseScript>,
}

impl Default for ReclassifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_name_chars: 10,
            prose_scripts: vec![ProseScript::Hiragana],
        }
    }
}

#[derive(Debug, Clone)]
struct Reclassifier {
    enabled: bool,
    max_name_chars: usize,
    scripts: Vec<Script>,
}

impl Reclassifier {
    fn new(config: &ReclassifyConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_name_chars: config.max_name_chars,
            scripts: config.prose_scripts.iter().map(|s| s.script()).collect(),
        }
    }

    fn is_prose(&self, text: &str) -> bool {
        if !self.enabled {
            return false;
        }
        if text.chars().count() > self.max_name_chars {
            return true;
        }
        text.chars().any(|c| {
            let mut buf = [0u8; 4];
            whatlang::detect_script(c.encode_utf8(&mut buf))
                .is_some_and(|script| self.scripts.contains(&script))
        })
    }
}

/// Which field unlabeled fragments go to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SegmentState {
    #[default]
    NoActiveField,
    InErrorName,
    InDescription,
    InExample,
}

impl SegmentState {
    pub fn active_field(self) -> Option<Field> {
        match self {
            SegmentState::NoActiveField => None,
            SegmentState::InErrorName => Some(Field::ErrorName),
            SegmentState::InDescription => Some(Field::Description),
            SegmentState::InExample => Some(Field::Example),
        }
    }

    fn entering(field: Field) -> Self {
        match field {
            Field::ErrorName => SegmentState::InErrorName,
            Field::Description => SegmentState::InDescription,
            Field::Example => SegmentState::InExample,
        }
    }
}

/// Reported to the progress hook after every fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentProgress {
    /// 0-based index of the fragment just consumed
    pub index: usize,
    pub state: SegmentState,
    /// Records sealed so far
    pub sealed: usize,
}

/// Output of [`Segmenter::segment_with_progress`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segmentation {
    pub records: Vec<Record>,
    /// Fragments consumed before finishing or stopping
    pub consumed: usize,
    pub cancelled: bool,
}

/// Normalizer + keyword table + reclassification policy.
#[derive(Debug, Clone)]
pub struct Segmenter {
    normalizer: Normalizer,
    keywords: KeywordTable,
    reclassifier: Reclassifier,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(
            Normalizer::default(),
            KeywordTable::default(),
            &ReclassifyConfig::default(),
        )
    }
}

impl Segmenter {
    pub fn new(normalizer: Normalizer, keywords: KeywordTable, reclassify: &ReclassifyConfig) -> Self {
        Self {
            normalizer,
            keywords,
            reclassifier: Reclassifier::new(reclassify),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Normalizer::new(&config.normalizer),
            KeywordTable::new(&config.keywords),
            &config.reclassify,
        )
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Start an incremental run.
    pub fn cursor(&self) -> SegmentCursor<'_> {
        SegmentCursor {
            segmenter: self,
            current: None,
            state: SegmentState::NoActiveField,
        }
    }

    /// Segment a whole fragment stream.
    pub fn segment<I, S>(&self, fragments: I) -> Vec<Record>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.segment_with_progress(fragments, |_| ControlFlow::Continue(()))
            .records
    }

    /// Segment with a hook called after every fragment.
    ///
    /// Returning `Break` stops consumption; the record under construction is
    /// still flushed.
    pub fn segment_with_progress<I, S, F>(&self, fragments: I, mut hook: F) -> Segmentation
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(&FragmentProgress) -> ControlFlow<()>,
    {
        let mut cursor = self.cursor();
        let mut out = Segmentation::default();

        for (index, fragment) in fragments.into_iter().enumerate() {
            if let Some(record) = cursor.push(fragment.as_ref()) {
                out.records.push(record);
            }
            out.consumed = index + 1;

            let progress = FragmentProgress {
                index,
                state: cursor.state(),
                sealed: out.records.len(),
            };
            if hook(&progress).is_break() {
                log::debug!("Segmentation stopped after {} fragments", out.consumed);
                out.cancelled = true;
                break;
            }
        }

        out.records.extend(cursor.finish());
        out
    }
}

/// Transient state for one document: the record under construction and the
/// active field. Sealed records are handed back to the caller.
#[derive(Debug)]
pub struct SegmentCursor<'a> {
    segmenter: &'a Segmenter,
    current: Option<Record>,
    state: SegmentState,
}

impl SegmentCursor<'_> {
    pub fn state(&self) -> SegmentState {
        self.state
    }

    /// Record under construction, if an error-name header has been seen.
    pub fn current(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    /// Consume one fragment. Returns the previous record when this fragment
    /// starts a new one.
    pub fn push(&mut self, fragment: &str) -> Option<Record> {
        let normalized = self.segmenter.normalizer.normalize(fragment);
        let text = normalized.trim();
        if text.is_empty() {
            return None;
        }

        if let Some(header) = self.segmenter.keywords.classify(text) {
            let remainder = header.remainder(text);
            return match header.field {
                Field::ErrorName => self.start_record(remainder),
                field => {
                    match self.current.as_mut() {
                        Some(record) => {
                            record.append(field, remainder);
                            self.transition(SegmentState::entering(field));
                        }
                        None => log::debug!("{} header before any error name, skipped: {:?}", field, text),
                    }
                    None
                }
            };
        }

        let Some(record) = self.current.as_mut() else {
            log::trace!("No active field, skipped: {:?}", text);
            return None;
        };
        match self.state.active_field() {
            Some(Field::ErrorName) if self.segmenter.reclassifier.is_prose(text) => {
                record.append(Field::Description, text);
                self.transition(SegmentState::InDescription);
            }
            Some(field) => record.append(field, text),
            None => log::trace!("No active field, skipped: {:?}", text),
        }
        None
    }

    /// Flush the record under construction.
    pub fn finish(self) -> Option<Record> {
        self.current.filter(|record| {
            let keep = !record.error_name.is_empty();
            if keep {
                log::debug!("Sealed {:?} at end of stream", record.error_name);
            }
            keep
        })
    }

    fn start_record(&mut self, name: &str) -> Option<Record> {
        let sealed = match self.current.take() {
            Some(record) if !record.error_name.is_empty() => {
                log::debug!("Sealed {:?}", record.error_name);
                Some(record)
            }
            // No name yet: the header names the record already under way
            unnamed => {
                self.current = unnamed;
                None
            }
        };

        let record = self.current.get_or_insert_with(Record::default);
        record.error_name = name.to_string();
        self.transition(SegmentState::InErrorName);
        sealed
    }

    fn transition(&mut self, next: SegmentState) {
        if self.state != next {
            log::trace!("{:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(fragments: &[&str]) -> Vec<Record> {
        Segmenter::default().segment(fragments)
    }

    #[test]
    fn test_single_labeled_entry() {
        let records = segment(&[
            "ErrorName: SyntaxError",
            "Description: unexpected token",
            "Example: def f(:",
        ]);
        assert_eq!(records, vec![Record::new("SyntaxError", "unexpected token", "def f(:")]);
    }

    #[test]
    fn test_consecutive_name_headers() {
        let records = segment(&["ErrorName: KeyError", "ErrorName: IndexError"]);
        assert_eq!(
            records,
            vec![Record::new("KeyError", "", ""), Record::new("IndexError", "", "")]
        );
    }

    #[test]
    fn test_no_name_header_yields_nothing() {
        assert!(segment(&["Description: orphan", "Example: x = 1", "text"]).is_empty());
        assert!(segment(&[] as &[&str]).is_empty());
    }

    #[test]
    fn test_fragments_before_first_header_are_skipped() {
        let records = segment(&["page title", "説明: stray", "ErrorName: NameError", "Description: undefined"]);
        assert_eq!(records, vec![Record::new("NameError", "undefined", "")]);
    }

    #[test]
    fn test_unlabeled_fragments_follow_active_field() {
        let records = segment(&[
            "エラー名",
            "TypeError",
            "説明",
            "型が合わない",
            "演算です",
            "発生例",
            "1 + \"a\"",
        ]);
        assert_eq!(
            records,
            vec![Record::new("TypeError", "型が合わない 演算です", "1 + \"a\"")]
        );
    }

    #[test]
    fn test_prose_after_name_moves_to_description() {
        let records = segment(&["ErrorName: ZeroDivisionError", "ゼロで割ろうとしたときに発生します"]);
        assert_eq!(records[0].error_name, "ZeroDivisionError");
        assert_eq!(records[0].description, "ゼロで割ろうとしたときに発生します");

        let records = segment(&["ErrorName:", "ValueError", "raised when the value is wrong"]);
        assert_eq!(records[0].error_name, "ValueError");
        assert_eq!(records[0].description, "raised when the value is wrong");
    }

    #[test]
    fn test_reclassification_can_be_disabled() {
        let segmenter = Segmenter::new(
            Normalizer::default(),
            KeywordTable::default(),
            &ReclassifyConfig {
                enabled: false,
                ..Default::default()
            },
        );
        let records = segmenter.segment(["ErrorName: A", "long enough prose"]);
        assert_eq!(records[0].error_name, "A long enough prose");
    }

    #[test]
    fn test_long_name_on_its_own_line_is_taken_for_prose() {
        // Longer than max_name_chars: the record never gets a name and is dropped
        let fragments = ["エラー名", "ZeroDivisionError", "Description: division by zero"];
        assert!(segment(&fragments).is_empty());

        let segmenter = Segmenter::new(
            Normalizer::default(),
            KeywordTable::default(),
            &ReclassifyConfig {
                max_name_chars: 20,
                ..Default::default()
            },
        );
        assert_eq!(
            segmenter.segment(fragments),
            vec![Record::new("ZeroDivisionError", "division by zero", "")]
        );
    }

    #[test]
    fn test_description_stays_active_after_reclassification() {
        let records = segment(&["ErrorName: OSError", "ファイルが見つかりません", "OS"]);
        assert_eq!(records[0].description, "ファイルが見つかりません OS");
    }

    #[test]
    fn test_normalizes_before_matching() {
        let records = segment(&["エラ一名：NameError", "說明：名前が未定義", "発 生 例", "print(x)"]);
        assert_eq!(records, vec![Record::new("NameError", "名前が未定義", "print(x)")]);
    }

    #[test]
    fn test_unnamed_header_reuses_record() {
        let records = segment(&["ErrorName:", "Description: first", "ErrorName: RecursionError"]);
        assert_eq!(records, vec![Record::new("RecursionError", "first", "")]);
    }

    #[test]
    fn test_entries_span_pages_in_order() {
        let page_one = ["ErrorName: ImportError", "Description: no module"];
        let page_two = ["named foo", "ErrorName: EOFError"];
        let records = Segmenter::default().segment(page_one.iter().chain(page_two.iter()));
        assert_eq!(
            records,
            vec![
                Record::new("ImportError", "no module named foo", ""),
                Record::new("EOFError", "", ""),
            ]
        );
    }

    #[test]
    fn test_cursor_seals_on_next_header() {
        let segmenter = Segmenter::default();
        let mut cursor = segmenter.cursor();
        assert_eq!(cursor.state(), SegmentState::NoActiveField);
        assert!(cursor.push("preamble").is_none());
        assert!(cursor.current().is_none());
        assert!(cursor.push("ErrorName: A").is_none());
        assert_eq!(cursor.state(), SegmentState::InErrorName);
        assert!(cursor.push("Example: a()").is_none());
        assert_eq!(cursor.state(), SegmentState::InExample);
        assert_eq!(cursor.current(), Some(&Record::new("A", "", "a()")));
        let sealed = cursor.push("ErrorName: B").unwrap();
        assert_eq!(sealed, Record::new("A", "", "a()"));
        assert_eq!(cursor.current(), Some(&Record::new("B", "", "")));
        assert_eq!(cursor.finish(), Some(Record::new("B", "", "")));
    }

    #[test]
    fn test_progress_hook_can_stop() {
        let fragments = ["ErrorName: A", "Description: a", "ErrorName: B", "ErrorName: C"];
        let result = Segmenter::default().segment_with_progress(fragments, |progress| {
            if progress.index == 1 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert!(result.cancelled);
        assert_eq!(result.consumed, 2);
        assert_eq!(result.records, vec![Record::new("A", "a", "")]);
    }

    #[test]
    fn test_progress_hook_sees_every_fragment() {
        let mut seen = Vec::new();
        let result = Segmenter::default().segment_with_progress(
            ["ErrorName: A", "x", "ErrorName: B"],
            |progress| {
                seen.push((progress.index, progress.sealed));
                ControlFlow::Continue(())
            },
        );
        assert!(!result.cancelled);
        assert_eq!(seen, vec![(0, 0), (1, 0), (2, 1)]);
        assert_eq!(result.records.len(), 2);
    }
}
