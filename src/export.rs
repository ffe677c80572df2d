//! Table export: one row per record, columns in [`Field::ALL`] order.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::{Field, Record};

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    /// Pick a format from a file extension, falling back to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ExportFormat::Json,
            _ => ExportFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Header row labels
    pub headers: [String; 3],
    /// Prefix CSV output with a UTF-8 byte order mark
    pub bom: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            headers: Field::ALL.map(|field| field.column_name().to_string()),
            bom: true,
        }
    }
}

/// Write records as CSV with a header row.
pub fn write_csv<W: Write>(records: &[Record], mut writer: W, config: &ExportConfig) -> Result<()> {
    if config.bom {
        writer.write_all("\u{feff}".as_bytes())?;
    }
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&config.headers)?;
    for record in records {
        csv_writer.write_record(record.columns())?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write records as a JSON array of objects keyed by column name.
pub fn write_json<W: Write>(records: &[Record], writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

/// Write records to `path` in `format`.
pub fn export_to_path(
    records: &[Record],
    path: &Path,
    format: ExportFormat,
    config: &ExportConfig,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        ExportFormat::Csv => write_csv(records, &mut writer, config)?,
        ExportFormat::Json => write_json(records, &mut writer)?,
    }
    writer.flush()?;
    log::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}
