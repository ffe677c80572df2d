//! Page rasterization and text recognition.
//!
//! Both are external collaborators reached through traits so the extraction
//! core never depends on how they are built. The bundled implementations shell
//! out to poppler's `pdftoppm` and to `tesseract`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::Fragment;

/// Turns a PDF into one image per page.
pub trait Rasterizer: Send + Sync {
    /// Render every page of `pdf` into `out_dir`, returning image paths in page order.
    fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Turns one page image into an ordered list of text fragments.
pub trait Recognizer: Send + Sync {
    /// `page` is 1-based and is copied into the returned fragments.
    fn recognize(&self, image: &Path, page: usize) -> Result<Vec<Fragment>>;
}

/// Settings for the bundled command-line tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Rasterization resolution
    pub dpi: u32,
    /// Render pages in grayscale
    pub grayscale: bool,
    /// Tesseract language list, e.g. "jpn+eng"
    pub languages: String,
    /// Tesseract page segmentation mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psm: Option<u8>,
    pub pdftoppm_path: String,
    pub tesseract_path: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            dpi: 400,
            grayscale: true,
            languages: "jpn+eng".to_string(),
            psm: None,
            pdftoppm_path: "pdftoppm".to_string(),
            tesseract_path: "tesseract".to_string(),
        }
    }
}

/// Run an external tool, mapping "not installed" and non-zero exits to errors.
fn run_tool(command: &mut Command, tool: &str, hint: &str) -> Result<Output> {
    match command.output() {
        Ok(output) if output.status.success() => Ok(output),
        Ok(output) => Err(Error::ToolFailed {
            tool: tool.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::ToolNotFound {
            tool: tool.to_string(),
            hint: hint.to_string(),
        }),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Rasterizer backed by poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    config: OcrConfig,
}

impl Pdftoppm {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }
}

impl Default for Pdftoppm {
    fn default() -> Self {
        Self::new(OcrConfig::default())
    }
}

impl Rasterizer for Pdftoppm {
    fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let start = Instant::now();
        let mut command = Command::new(&self.config.pdftoppm_path);
        command.args(["-png", "-r", &self.config.dpi.to_string()]);
        if self.config.grayscale {
            command.arg("-gray");
        }
        command.arg(pdf).arg(out_dir.join("page"));
        run_tool(&mut command, "pdftoppm", "install poppler-utils")?;

        let pages = find_page_images(out_dir)?;
        if pages.is_empty() {
            return Err(Error::NoPages(pdf.to_path_buf()));
        }
        log::info!(
            "Rasterized {} pages at {} dpi in {} ms",
            pages.len(),
            self.config.dpi,
            start.elapsed().as_millis()
        );
        Ok(pages)
    }
}

/// Collect `page-N.png` files, ordered by page number.
///
/// pdftoppm pads N to the width of the last page number, so sort numerically.
fn find_page_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages: Vec<(u32, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let number = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix("page-"))
            .and_then(|rest| rest.strip_suffix(".png"))
            .and_then(|digits| digits.parse::<u32>().ok());
        if let Some(number) = number {
            pages.push((number, path));
        }
    }
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// Recognizer backed by the `tesseract` command line, using its TSV output.
#[derive(Debug, Clone)]
pub struct Tesseract {
    config: OcrConfig,
}

impl Tesseract {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }
}

impl Default for Tesseract {
    fn default() -> Self {
        Self::new(OcrConfig::default())
    }
}

impl Recognizer for Tesseract {
    fn recognize(&self, image: &Path, page: usize) -> Result<Vec<Fragment>> {
        let start = Instant::now();
        let mut command = Command::new(&self.config.tesseract_path);
        command
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.config.languages]);
        if let Some(psm) = self.config.psm {
            command.args(["--psm", &psm.to_string()]);
        }
        command.arg("tsv");

        let output = run_tool(&mut command, "tesseract", "install tesseract-ocr and its jpn data")?;
        let fragments = parse_tsv(&String::from_utf8_lossy(&output.stdout), page)?;
        log::debug!(
            "Page {}: {} fragments in {} ms",
            page,
            fragments.len(),
            start.elapsed().as_millis()
        );
        Ok(fragments)
    }
}

/// Parse tesseract TSV into one fragment per text line.
///
/// Columns: level page block par line word left top width height conf text.
/// Only word rows (level 5) carry text.
pub fn parse_tsv(tsv: &str, page: usize) -> Result<Vec<Fragment>> {
    let mut fragments = Vec::new();
    let mut line_key: Option<(u32, u32, u32)> = None;
    let mut words: Vec<&str> = Vec::new();
    let mut confidences: Vec<f32> = Vec::new();

    for (index, row) in tsv.lines().enumerate() {
        if row.trim().is_empty() || row.starts_with("level") {
            continue;
        }
        let columns: Vec<&str> = row.splitn(12, '\t').collect();
        if columns.len() < 11 {
            return Err(Error::MalformedOutput {
                line: index + 1,
                reason: format!("expected at least 11 columns, found {}", columns.len()),
            });
        }
        let number = |i: usize| {
            columns[i].trim().parse::<u32>().map_err(|_| Error::MalformedOutput {
                line: index + 1,
                reason: format!("column {} is not a number: {:?}", i + 1, columns[i]),
            })
        };
        if number(0)? != 5 {
            continue;
        }
        let text = columns.get(11).copied().map(str::trim).unwrap_or("");
        if text.is_empty() {
            continue;
        }

        let key = (number(2)?, number(3)?, number(4)?);
        if line_key != Some(key) {
            flush_line(&mut fragments, &mut words, &mut confidences, page);
            line_key = Some(key);
        }
        words.push(text);
        if let Ok(conf) = columns[10].trim().parse::<f32>() {
            if conf >= 0.0 {
                confidences.push(conf);
            }
        }
    }
    flush_line(&mut fragments, &mut words, &mut confidences, page);

    Ok(fragments)
}

fn flush_line(
    fragments: &mut Vec<Fragment>,
    words: &mut Vec<&str>,
    confidences: &mut Vec<f32>,
    page: usize,
) {
    if words.is_empty() {
        return;
    }
    let confidence = if confidences.is_empty() {
        None
    } else {
        Some(confidences.iter().sum::<f32>() / confidences.len() as f32)
    };
    fragments.push(Fragment {
        text: join_words(words),
        confidence,
        page,
        order: fragments.len(),
    });
    words.clear();
    confidences.clear();
}

/// Join words of one line. Japanese text comes back one word per character or
/// two, so the space is dropped when both neighbours are non-ASCII.
fn join_words(words: &[&str]) -> String {
    let mut line = String::new();
    for word in words {
        let both_wide = match (line.chars().last(), word.chars().next()) {
            (Some(prev), Some(next)) => !prev.is_ascii() && !next.is_ascii(),
            _ => true,
        };
        if !line.is_empty() && !both_wide {
            line.push(' ');
        }
        line.push_str(word);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word(block: u32, line: u32, conf: &str, text: &str) -> String {
        format!("5\t1\t{}\t1\t{}\t1\t0\t0\t10\t10\t{}\t{}", block, line, conf, text)
    }

    #[test]
    fn test_groups_words_by_line() {
        let tsv = [
            HEADER.to_string(),
            "1\t1\t0\t0\t0\t0\t0\t0\t2480\t3508\t-1\t".to_string(),
            word(1, 1, "90", "ErrorName:"),
            word(1, 1, "80", "SyntaxError"),
            word(1, 2, "70", "Description:"),
            word(1, 2, "-1", "unexpected"),
            word(1, 2, "60", "token"),
        ]
        .join("\n");

        let fragments = parse_tsv(&tsv, 3).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].text, "ErrorName: SyntaxError");
        assert_eq!(fragments[0].confidence, Some(85.0));
        assert_eq!(fragments[0].page, 3);
        assert_eq!(fragments[1].text, "Description: unexpected token");
        assert_eq!(fragments[1].confidence, Some(65.0));
        assert_eq!(fragments[1].order, 1);
    }

    #[test]
    fn test_japanese_words_join_without_spaces() {
        let tsv = [word(1, 1, "90", "エラー"), word(1, 1, "90", "名"), word(1, 1, "90", "KeyError")].join("\n");
        let fragments = parse_tsv(&tsv, 1).unwrap();
        assert_eq!(fragments[0].text, "エラー名 KeyError");
    }

    #[test]
    fn test_new_block_starts_new_fragment() {
        let tsv = [word(1, 1, "90", "a"), word(2, 1, "90", "b")].join("\n");
        let texts: Vec<String> = parse_tsv(&tsv, 1).unwrap().into_iter().map(|f| f.text).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_rejects_truncated_rows() {
        let err = parse_tsv("5\t1\t1", 1).unwrap_err();
        assert!(matches!(err, Error::MalformedOutput { line: 1, .. }));
        assert!(err.to_string().contains("expected at least 11 columns, found 3"));
    }

    #[test]
    fn test_empty_output_has_no_fragments() {
        assert!(parse_tsv(HEADER, 1).unwrap().is_empty());
        assert!(parse_tsv("", 1).unwrap().is_empty());
    }

    #[test]
    fn test_page_images_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-02.png", "page-1.png", "notes.txt", "page-x.png"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let pages = find_page_images(dir.path()).unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page-1.png", "page-02.png", "page-10.png"]);
    }

    #[test]
    fn test_missing_binary_is_reported() {
        let config = OcrConfig {
            tesseract_path: "definitely-not-a-real-tesseract-binary".to_string(),
            ..Default::default()
        };
        let err = Tesseract::new(config)
            .recognize(Path::new("missing.png"), 1)
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }
}
