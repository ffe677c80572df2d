//! End-to-end extraction: PDF → page images → fragments → records.
//!
//! Pages are recognized in parallel, but their fragments are always put back
//! in page order before segmentation; the segmenter sees one sequential
//! stream for the whole document.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use rayon::prelude::*;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ocr::{Pdftoppm, Rasterizer, Recognizer, Tesseract};
use crate::postprocess::PostProcessor;
use crate::record::{Fragment, Record};
use crate::segmenter::Segmenter;

/// Progress events passed to the hook. Returning `Break` cancels the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Rasterized { pages: usize },
    PageRecognized {
        /// 1-based page number
        page: usize,
        /// Pages finished so far, in completion order
        completed: usize,
        total: usize,
        fragments: usize,
    },
    Segmented { records: usize },
}

pub struct Pipeline {
    rasterizer: Box<dyn Rasterizer>,
    recognizer: Box<dyn Recognizer>,
    segmenter: Segmenter,
    post_processor: PostProcessor,
}

impl Pipeline {
    pub fn new(
        rasterizer: Box<dyn Rasterizer>,
        recognizer: Box<dyn Recognizer>,
        segmenter: Segmenter,
        post_processor: PostProcessor,
    ) -> Self {
        Self {
            rasterizer,
            recognizer,
            segmenter,
            post_processor,
        }
    }

    /// pdftoppm + tesseract, with policies from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_tools(
            config,
            Box::new(Pdftoppm::new(config.ocr.clone())),
            Box::new(Tesseract::new(config.ocr.clone())),
        )
    }

    /// Custom collaborators, with policies from `config`.
    pub fn with_tools(
        config: &Config,
        rasterizer: Box<dyn Rasterizer>,
        recognizer: Box<dyn Recognizer>,
    ) -> Result<Self> {
        let segmenter = Segmenter::from_config(config);
        let post_processor = PostProcessor::new(&config.post_process, segmenter.normalizer().clone())?;
        Ok(Self::new(rasterizer, recognizer, segmenter, post_processor))
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    pub fn extract_pdf<F>(&self, pdf: &Path, mut hook: F) -> Result<Vec<Record>>
    where
        F: FnMut(&Progress) -> ControlFlow<()>,
    {
        let scratch = tempfile::tempdir()?;
        let images = self.rasterizer.rasterize(pdf, scratch.path())?;
        if hook(&Progress::Rasterized { pages: images.len() }).is_break() {
            return Err(Error::Cancelled);
        }
        self.extract_images(&images, hook)
    }

    /// Extract from page images already in page order.
    pub fn extract_images<F>(&self, images: &[PathBuf], mut hook: F) -> Result<Vec<Record>>
    where
        F: FnMut(&Progress) -> ControlFlow<()>,
    {
        let pages = self.recognize_pages(images, &mut hook)?;
        self.extract_fragments(pages, hook)
    }

    /// Segment and clean per-page fragments.
    pub fn extract_fragments<F>(&self, pages: Vec<Vec<Fragment>>, mut hook: F) -> Result<Vec<Record>>
    where
        F: FnMut(&Progress) -> ControlFlow<()>,
    {
        let start = Instant::now();
        let fragments: Vec<Fragment> = pages
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(order, fragment)| Fragment { order, ..fragment })
            .collect();

        let records = self.segmenter.segment(&fragments);
        let records = self.post_processor.apply(records);
        log::info!(
            "Segmented {} fragments into {} records in {} ms",
            fragments.len(),
            records.len(),
            start.elapsed().as_millis()
        );

        if hook(&Progress::Segmented { records: records.len() }).is_break() {
            return Err(Error::Cancelled);
        }
        if records.is_empty() {
            return Err(Error::NothingRecognized);
        }
        Ok(records)
    }

    /// Recognize every page on the rayon pool while reporting progress here.
    fn recognize_pages<F>(&self, images: &[PathBuf], hook: &mut F) -> Result<Vec<Vec<Fragment>>>
    where
        F: FnMut(&Progress) -> ControlFlow<()>,
    {
        let total = images.len();
        let stop = AtomicBool::new(false);
        let recognizer = self.recognizer.as_ref();
        let mut pages: Vec<Option<Vec<Fragment>>> = vec![None; total];
        let mut failure: Option<Error> = None;

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel();
            let stop = &stop;
            scope.spawn(move || {
                images
                    .par_iter()
                    .enumerate()
                    .for_each_with(tx, |tx, (index, image)| {
                        if stop.load(Ordering::Relaxed) {
                            return;
                        }
                        let _ = tx.send((index, recognizer.recognize(image, index + 1)));
                    });
            });

            let mut completed = 0;
            for (index, result) in rx {
                if failure.is_some() {
                    continue;
                }
                match result {
                    Ok(fragments) => {
                        completed += 1;
                        let progress = Progress::PageRecognized {
                            page: index + 1,
                            completed,
                            total,
                            fragments: fragments.len(),
                        };
                        pages[index] = Some(fragments);
                        if hook(&progress).is_break() {
                            stop.store(true, Ordering::Relaxed);
                            failure = Some(Error::Cancelled);
                        }
                    }
                    Err(e) => {
                        log::error!("Recognition failed on page {}: {}", index + 1, e);
                        stop.store(true, Ordering::Relaxed);
                        failure = Some(e);
                    }
                }
            }
        });

        if let Some(e) = failure {
            return Err(e);
        }
        Ok(pages.into_iter().map(Option::unwrap_or_default).collect())
    }
}
