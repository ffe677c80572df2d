//! Fragment normalizer: static repairs for known OCR misrecognitions.
//!
//! Every rule is an exact substring replacement. Text no rule matches passes
//! through unchanged. Rules run in table order and each one replaces all of its
//! occurrences in a single pass, so when two rules overlap the earlier one wins.
//!
//! Applying the normalizer twice can change the text again in two cases:
//!
//! - a rule's output contains another rule's input. [`Normalizer::chained_rules`]
//!   reports such pairs.
//! - a later rule's output forms an earlier rule's input together with the
//!   surrounding text. With the built-in table, `ifX=1` becomes `ifx =1` and only
//!   a second pass turns that into `if x =1`. This depends on the input and is
//!   not reported.
//!
//! Neither case is rewritten.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// One `from -> to` substring repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceRule {
    pub from: String,
    pub to: String,
}

impl ReplaceRule {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

lazy_static! {
    /// Built-in repairs for the Python error glossary scans (Japanese + English).
    static ref BUILTIN_RULES: Vec<(&'static str, &'static str)> = vec![
        // Python code that lost or gained characters
        ("汗fx", "if x"),
        ("ifx", "if x"),
        ("deffunc", "def func"),
        ("Noneappend", "None.append"),
        ("メ=", "x ="),
        ("X=", "x ="),
        ("1OOO", "1000"),
        ("mathexp", "math.exp"),

        // Latin letters read as look-alikes
        ("Nlemory", "Memory"),
        ("VVorld", "World"),

        // Kanji/kana confusions in the prose
        ("付け志れ", "付け忘れ"),
        ("閉じ志れ", "閉じ忘れ"),
        ("指孤", "括弧"),
        ("報おう", "扱おう"),
        ("インボート", "インポート"),

        // Header labels: traditional forms, 一/ー and 工/エ confusion, spaced characters
        ("說明", "説明"),
        ("エラ一名", "エラー名"),
        ("工ラー", "エラー"),
        ("説 明", "説明"),
        ("発 生 例", "発生例"),
    ];
}

/// Rule set used for the built-in configuration.
pub fn builtin_rules() -> Vec<ReplaceRule> {
    BUILTIN_RULES
        .iter()
        .map(|(from, to)| ReplaceRule::new(*from, *to))
        .collect()
}

/// Normalizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Apply Unicode NFKC before the rules (full-width letters and colons become
    /// ASCII). Off by default: it also rewrites exported description and example text.
    pub fold_width: bool,
    /// Start from the built-in rule table
    pub builtin_rules: bool,
    /// Extra rules, applied after the built-in table
    pub rules: Vec<ReplaceRule>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            fold_width: false,
            builtin_rules: true,
            rules: Vec::new(),
        }
    }
}

/// Applies the replacement table to recognized text.
#[derive(Debug, Clone)]
pub struct Normalizer {
    rules: Vec<ReplaceRule>,
    fold_width: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

impl Normalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        let mut rules = if config.builtin_rules {
            builtin_rules()
        } else {
            Vec::new()
        };
        rules.extend(config.rules.iter().cloned());
        Self::with_rules(rules, config.fold_width)
    }

    /// Build from an explicit rule list (table order is application order).
    pub fn with_rules(rules: Vec<ReplaceRule>, fold_width: bool) -> Self {
        let rules: Vec<ReplaceRule> = rules
            .into_iter()
            .filter_map(|rule| {
                if rule.from.is_empty() {
                    log::warn!("Ignoring replacement rule with empty pattern (-> {:?})", rule.to);
                    return None;
                }
                // Patterns must look like the text they will be matched against
                if fold_width {
                    Some(ReplaceRule::new(fold(&rule.from), rule.to))
                } else {
                    Some(rule)
                }
            })
            .collect();

        let normalizer = Self { rules, fold_width };
        for (first, second) in normalizer.chained_rules() {
            log::warn!(
                "Replacement rule {:?} -> {:?} produces input for {:?} -> {:?}; normalization is not idempotent for this text",
                normalizer.rules[first].from,
                normalizer.rules[first].to,
                normalizer.rules[second].from,
                normalizer.rules[second].to,
            );
        }
        normalizer
    }

    pub fn rules(&self) -> &[ReplaceRule] {
        &self.rules
    }

    /// Repair known corruption in `text`.
    pub fn normalize(&self, text: &str) -> String {
        self.normalize_counted(text).0
    }

    /// Repair known corruption and report how many substitutions were made.
    pub fn normalize_counted(&self, text: &str) -> (String, u64) {
        let mut result = if self.fold_width {
            fold(text)
        } else {
            text.to_string()
        };
        let mut total_subs: u64 = 0;

        for rule in &self.rules {
            let count = result.matches(rule.from.as_str()).count();
            if count > 0 {
                result = result.replace(rule.from.as_str(), &rule.to);
                total_subs += count as u64;
            }
        }

        (result, total_subs)
    }

    /// Index pairs `(a, b)` where rule `a`'s replacement contains rule `b`'s pattern.
    pub fn chained_rules(&self) -> Vec<(usize, usize)> {
        let mut chains = Vec::new();
        for (a, first) in self.rules.iter().enumerate() {
            for (b, second) in self.rules.iter().enumerate() {
                if first.to.contains(second.from.as_str()) {
                    chains.push((a, b));
                }
            }
        }
        chains
    }
}

fn fold(text: &str) -> String {
    text.nfkc().collect()
}
