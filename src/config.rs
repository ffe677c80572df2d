//! Configuration file support.
//!
//! Every extraction policy lives in one TOML document: the normalizer table,
//! the keyword spellings per field, the reclassification heuristic, the
//! clean-up pass, the OCR tools and the export layout. All sections are
//! optional; a missing section keeps its built-in defaults.
//!
//! ```toml
//! [keywords]
//! match_order = "priority"
//! error_name = ["ErrorName", "エラー名", "工ラー名"]
//!
//! [reclassify]
//! max_name_chars = 12
//! prose_scripts = ["hiragana", "katakana"]
//!
//! [[normalizer.rules]]
//! from = "Tyep"
//! to = "Type"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::export::ExportConfig;
use crate::keywords::KeywordConfig;
use crate::normalizer::NormalizerConfig;
use crate::ocr::OcrConfig;
use crate::postprocess::PostProcessConfig;
use crate::segmenter::ReclassifyConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub normalizer: NormalizerConfig,
    pub keywords: KeywordConfig,
    pub reclassify: ReclassifyConfig,
    pub post_process: PostProcessConfig,
    pub ocr: OcrConfig,
    pub export: ExportConfig,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.keywords.error_name.iter().all(|k| k.is_empty()) {
            return Err(Error::Config(
                "keywords.error_name needs at least one non-empty keyword".to_string(),
            ));
        }
        if self.ocr.dpi == 0 {
            return Err(Error::Config("ocr.dpi must be positive".to_string()));
        }
        if self.ocr.languages.trim().is_empty() {
            return Err(Error::Config("ocr.languages must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::MatchOrder;
    use crate::segmenter::ProseScript;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = Config::from_toml_str(
            r#"
            [keywords]
            match_order = "position"
            example = ["Example", "例"]

            [reclassify]
            max_name_chars = 12
            prose_scripts = ["hiragana", "han"]

            [[normalizer.rules]]
            from = "Tyep"
            to = "Type"
            "#,
        )
        .unwrap();

        assert_eq!(config.keywords.match_order, MatchOrder::Position);
        assert_eq!(config.keywords.example, vec!["Example", "例"]);
        assert_eq!(config.keywords.error_name, KeywordConfig::default().error_name);
        assert_eq!(config.reclassify.max_name_chars, 12);
        assert!(config.reclassify.enabled);
        assert_eq!(config.reclassify.prose_scripts, vec![ProseScript::Hiragana, ProseScript::Han]);
        assert_eq!(config.normalizer.rules.len(), 1);
        assert!(config.normalizer.builtin_rules);
        assert_eq!(config.ocr.dpi, 400);
    }

    #[test]
    fn test_rendered_default_parses_back() {
        let text = Config::default().to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), Config::default());
    }

    #[test]
    fn test_rejects_missing_name_keywords() {
        let err = Config::from_toml_str("[keywords]\nerror_name = []").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_unknown_match_order() {
        let err = Config::from_toml_str("[keywords]\nmatch_order = \"random\"").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glossary.toml");
        fs::write(&path, "[ocr]\ndpi = 300\nlanguages = \"jpn\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.ocr.dpi, 300);
        assert_eq!(config.ocr.languages, "jpn");
    }
}
