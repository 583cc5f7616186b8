//! Document driver: runs the walker over a page range and writes the result.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lopdf::Document;
use serde::Serialize;

use eraser_core::error::{EraseError, Result};
use eraser_core::options::EraseOptions;
use eraser_core::range::PageRange;
use eraser_core::stats::{EraseStats, ProgressReporter};

use crate::context::EraseContext;
use crate::walker::{PageOutcome, Walker};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageReport {
    pub page_number: u32,
    pub outcome: PageOutcome,
}

/// Summary of one run over a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EraseReport {
    pub range: PageRange,
    pub stats: EraseStats,
    pub pages: Vec<PageReport>,
    /// The run stopped at a page boundary because cancellation was requested.
    pub cancelled: bool,
}

impl EraseReport {
    pub fn failed_pages(&self) -> impl Iterator<Item = &PageReport> {
        self.pages
            .iter()
            .filter(|p| matches!(p.outcome, PageOutcome::Failed { .. }))
    }
}

/// A processed document saved to a kept temporary file.
#[derive(Debug)]
pub struct ProcessedFile {
    pub path: PathBuf,
    pub report: EraseReport,
}

/// Load a PDF from disk.
pub fn open_pdf(path: &Path) -> Result<Document> {
    Document::load(path).map_err(|e| {
        EraseError::Pdf(format!("Failed to load PDF {}: {}", path.display(), e))
    })
}

/// Number of pages in the PDF at `path`.
pub fn page_count(path: &Path) -> Result<u32> {
    let doc = open_pdf(path)?;
    Ok(doc.get_pages().len() as u32)
}

/// Runs the box eraser over documents.
pub struct BoxEraser {
    options: EraseOptions,
    progress_reporter: Option<ProgressReporter>,
    cancel: Option<Arc<AtomicBool>>,
}

impl BoxEraser {
    pub fn new(options: EraseOptions) -> Self {
        Self {
            options,
            progress_reporter: None,
            cancel: None,
        }
    }

    pub fn options(&self) -> &EraseOptions {
        &self.options
    }

    /// Called after every page with the completed fraction of the range and
    /// the running statistics.
    pub fn progress_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Checked before each page; setting it stops the run at the next page
    /// boundary.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn report_progress(&self, fraction: f64, stats: &EraseStats) {
        if let Some(ref reporter) = self.progress_reporter {
            reporter(fraction, stats);
        }
    }

    /// Erase boxes on pages `start..=end` (1-based, clamped to the document)
    /// of an already loaded document. Each call is an independent run.
    pub fn erase_document(
        &self,
        doc: &mut Document,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<EraseReport> {
        let pages = doc.get_pages();
        let range = PageRange::clamp(start, end, pages.len() as u32)?;
        log::info!("Processing pages {} of {}", range, pages.len());

        let mut ctx = EraseContext::new();
        let mut reports = Vec::with_capacity(range.len() as usize);
        let mut cancelled = false;

        for page_number in range.iter() {
            if self.is_cancelled() {
                log::warn!("Cancelled before page {}", page_number);
                cancelled = true;
                break;
            }

            let outcome = match pages.get(&page_number) {
                Some(&page_id) => {
                    Walker::new(doc, &mut ctx, &self.options).process_page(page_number, page_id)
                }
                None => PageOutcome::Failed {
                    reason: format!("page {} not found in page tree", page_number),
                },
            };

            if let PageOutcome::Failed { ref reason } = outcome {
                log::error!("Error processing page {}: {}", page_number, reason);
            }

            reports.push(PageReport {
                page_number,
                outcome,
            });
            self.report_progress(range.fraction_after(page_number), &ctx.stats);
        }

        log::info!(
            "Processing complete ({} of {} page(s) handled). Statistics: {}",
            ctx.stats.pages_seen(),
            range.len(),
            ctx.stats
        );

        Ok(EraseReport {
            range,
            stats: ctx.stats,
            pages: reports,
            cancelled,
        })
    }

    /// Load `path` and erase boxes on the given range.
    pub fn process_pdf(
        &self,
        path: &Path,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<(Document, EraseReport)> {
        let mut doc = open_pdf(path)?;
        let report = self.erase_document(&mut doc, start, end)?;
        Ok((doc, report))
    }

    /// Write `doc` to `path`, compressing streams first if configured.
    pub fn save(&self, doc: &mut Document, path: &Path) -> Result<()> {
        if self.options.compress_output {
            doc.compress();
        }
        doc.save(path).map_err(|e| {
            EraseError::Pdf(format!("Failed to save PDF to {}: {}", path.display(), e))
        })?;
        log::info!("Saved processed PDF to {}", path.display());
        Ok(())
    }

    /// Process `path` and save the result to a new temporary `.pdf` file
    /// that outlives this call. The caller owns the file.
    pub fn process_pdf_file(
        &self,
        path: &Path,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<ProcessedFile> {
        let (mut doc, report) = self.process_pdf(path, start, end)?;

        let tmp = tempfile::Builder::new()
            .prefix("erased-")
            .suffix(".pdf")
            .tempfile()?;
        let (_, out_path) = tmp.keep().map_err(|e| EraseError::Io(e.error))?;

        self.save(&mut doc, &out_path)?;
        Ok(ProcessedFile {
            path: out_path,
            report,
        })
    }
}
