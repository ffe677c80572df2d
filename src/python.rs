//! Python bindings via PyO3 (feature `python`).
//!
//! ```python
//! import rust_ocr_glossary as g
//!
//! text, subs = g.normalize("エラ一名：NameError")
//! rows = g.segment(["ErrorName: SyntaxError", "Description: unexpected token"])
//! rows = g.extract_pdf("errors.pdf", output_path="errors.csv")
//! ```

use std::ops::ControlFlow;
use std::path::Path;

use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::Config;
use crate::error::Error;
use crate::export::{ExportFormat, export_to_path};
use crate::pipeline::Pipeline;
use crate::postprocess::PostProcessor;
use crate::record::Record;
use crate::segmenter::Segmenter;

fn to_py_err(e: Error) -> PyErr {
    match e {
        Error::Io(_) | Error::NoPages(_) => PyIOError::new_err(e.to_string()),
        Error::Config(_) | Error::ConfigParse(_) | Error::Pattern(_) => {
            PyValueError::new_err(e.to_string())
        }
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

fn load_config(config_path: Option<String>) -> PyResult<Config> {
    match config_path {
        Some(path) => Config::load(Path::new(&path)).map_err(to_py_err),
        None => Ok(Config::default()),
    }
}

/// One glossary row.
#[pyclass]
#[derive(Clone)]
struct GlossaryRecord {
    #[pyo3(get)]
    error_name: String,
    #[pyo3(get)]
    description: String,
    #[pyo3(get)]
    example: String,
}

#[pymethods]
impl GlossaryRecord {
    fn __repr__(&self) -> String {
        format!(
            "GlossaryRecord(error_name={:?}, description={:?}, example={:?})",
            self.error_name, self.description, self.example
        )
    }
}

impl From<Record> for GlossaryRecord {
    fn from(record: Record) -> Self {
        Self {
            error_name: record.error_name,
            description: record.description,
            example: record.example,
        }
    }
}

/// Repair known OCR misrecognitions.
/// Returns: (text, substitution_count)
#[pyfunction]
#[pyo3(signature = (text, config_path=None))]
fn normalize(text: String, config_path: Option<String>) -> PyResult<(String, u64)> {
    let config = load_config(config_path)?;
    let segmenter = Segmenter::from_config(&config);
    Ok(segmenter.normalizer().normalize_counted(&text))
}

/// Rebuild records from fragments already in document order.
#[pyfunction]
#[pyo3(signature = (fragments, config_path=None, post_process=true))]
fn segment(
    fragments: Vec<String>,
    config_path: Option<String>,
    post_process: bool,
) -> PyResult<Vec<GlossaryRecord>> {
    let config = load_config(config_path)?;
    let segmenter = Segmenter::from_config(&config);
    let mut records = segmenter.segment(&fragments);
    if post_process {
        let post = PostProcessor::new(&config.post_process, segmenter.normalizer().clone())
            .map_err(to_py_err)?;
        records = post.apply(records);
    }
    Ok(records.into_iter().map(GlossaryRecord::from).collect())
}

/// OCR a scanned PDF and rebuild its glossary table.
/// Raises RuntimeError when no entry is recognized.
#[pyfunction]
#[pyo3(signature = (pdf_path, output_path=None, config_path=None))]
fn extract_pdf(
    pdf_path: String,
    output_path: Option<String>,
    config_path: Option<String>,
) -> PyResult<Vec<GlossaryRecord>> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config).map_err(to_py_err)?;
    let records = pipeline
        .extract_pdf(Path::new(&pdf_path), |_| ControlFlow::Continue(()))
        .map_err(to_py_err)?;

    if let Some(output_path) = output_path {
        let path = Path::new(&output_path);
        export_to_path(&records, path, ExportFormat::from_path(path), &config.export)
            .map_err(to_py_err)?;
    }
    Ok(records.into_iter().map(GlossaryRecord::from).collect())
}

#[pymodule]
fn rust_ocr_glossary(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(normalize, m)?)?;
    m.add_function(wrap_pyfunction!(segment, m)?)?;
    m.add_function(wrap_pyfunction!(extract_pdf, m)?)?;
    m.add_class::<GlossaryRecord>()?;
    Ok(())
}
