//! Error types for the extraction boundary.
//!
//! Normalization and segmentation never fail; these errors come from the
//! surrounding shell (configuration, external tools, file output) and from
//! the one observable failure of the whole run: nothing was recognized.

use std::path::PathBuf;

/// Result type alias for glossary extraction.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur around the extraction core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No fragment ever matched an error-name header
    #[error("No glossary entries were recognized")]
    NothingRecognized,

    /// The progress hook asked the run to stop
    #[error("Extraction cancelled")]
    Cancelled,

    /// An external binary is not installed or not on PATH
    #[error("{tool} not found ({hint})")]
    ToolNotFound {
        /// Binary name
        tool: String,
        /// Install hint shown to the user
        hint: String,
    },

    /// An external binary ran but reported failure
    #[error("{tool} failed: {stderr}")]
    ToolFailed {
        /// Binary name
        tool: String,
        /// Captured standard error
        stderr: String,
    },

    /// Rasterization produced no page images
    #[error("No page images were produced for {0}")]
    NoPages(PathBuf),

    /// Recognizer output could not be parsed
    #[error("Malformed recognizer output at line {line}: {reason}")]
    MalformedOutput {
        /// 1-based line in the recognizer output
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration file is not valid TOML for [`crate::config::Config`]
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be rendered as TOML
    #[error("Failed to render configuration: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    /// Invalid regular expression in configuration
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV export error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON export error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
