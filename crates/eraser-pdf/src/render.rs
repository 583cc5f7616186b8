//! Before/after page previews via `pdftoppm` (poppler-utils).

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::process::Command;

use rayon::prelude::*;

use eraser_core::error::{EraseError, Result};
use eraser_core::options::{EraseOptions, PreviewFormat};

/// Check that pdftoppm is available on the system.
pub fn check_pdftoppm() -> Result<()> {
    let which = Command::new("which")
        .arg("pdftoppm")
        .output()
        .map_err(|e| EraseError::Render(format!("Failed to check for pdftoppm: {}", e)))?;

    if !which.status.success() {
        return Err(EraseError::Render(
            "pdftoppm (poppler-utils) is required for previews. \
             Install with: brew install poppler (macOS) or apt install poppler-utils (Linux)"
                .to_string(),
        ));
    }
    Ok(())
}

/// One page rendered from the original and from the processed document.
#[derive(Debug, Clone)]
pub struct PreviewPair {
    pub page_number: u32,
    pub original: Vec<u8>,
    pub processed: Vec<u8>,
}

/// Render the given pages, one pdftoppm run per contiguous batch.
/// Returns page_number -> image bytes in the configured preview format.
pub fn render_pages(
    pdf_path: &Path,
    page_numbers: &[u32],
    options: &EraseOptions,
) -> Result<HashMap<u32, Vec<u8>>> {
    if page_numbers.is_empty() {
        return Ok(HashMap::new());
    }

    check_pdftoppm()?;

    let ranges = contiguous_ranges(page_numbers);
    let wanted: BTreeSet<u32> = page_numbers.iter().copied().collect();
    let extension = options.preview_format.extension();

    log::info!(
        "Rendering {} page(s) of {} in {} batch(es) at {} DPI...",
        wanted.len(),
        pdf_path.display(),
        ranges.len(),
        options.preview_dpi
    );

    let batch_results: Vec<Result<HashMap<u32, Vec<u8>>>> = ranges
        .par_iter()
        .map(|&(first, last)| {
            let tmp_dir = tempfile::TempDir::new()
                .map_err(|e| EraseError::Render(format!("Failed to create temp dir: {}", e)))?;

            let prefix = tmp_dir.path().join("page");
            let prefix_str = prefix
                .to_str()
                .ok_or_else(|| EraseError::Render("Invalid temp path".to_string()))?;

            let output = pdftoppm_command(options)
                .arg("-f")
                .arg(first.to_string())
                .arg("-l")
                .arg(last.to_string())
                .arg(pdf_path.as_os_str())
                .arg(prefix_str)
                .output()
                .map_err(|e| EraseError::Render(format!("Failed to run pdftoppm: {}", e)))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(EraseError::Render(format!(
                    "pdftoppm failed for pages {}-{}: {}",
                    first, last, stderr
                )));
            }

            let mut batch = HashMap::new();
            for page_num in (first..=last).filter(|p| wanted.contains(p)) {
                match find_rendered_page(tmp_dir.path(), page_num, extension) {
                    Some(path) => {
                        let data = std::fs::read(&path).map_err(|e| {
                            EraseError::Render(format!(
                                "Failed to read rendered page {}: {}",
                                page_num, e
                            ))
                        })?;
                        batch.insert(page_num, data);
                    }
                    None => log::warn!("No rendered image found for page {}", page_num),
                }
            }
            Ok(batch)
        })
        .collect();

    let mut result = HashMap::new();
    for batch_result in batch_results {
        result.extend(batch_result?);
    }
    Ok(result)
}

fn pdftoppm_command(options: &EraseOptions) -> Command {
    let mut command = Command::new("pdftoppm");
    match options.preview_format {
        PreviewFormat::Png => {
            command.arg("-png");
        }
        PreviewFormat::Jpeg => {
            command
                .arg("-jpeg")
                .arg("-jpegopt")
                .arg(format!("quality={}", options.jpeg_quality));
        }
    }
    command.arg("-r").arg(options.preview_dpi.to_string());
    command
}

/// Render the same pages from both documents side by side.
/// Pages missing from either rendering are dropped.
pub fn render_before_after(
    original: &Path,
    processed: &Path,
    page_numbers: &[u32],
    options: &EraseOptions,
) -> Result<Vec<PreviewPair>> {
    let (before, after) = rayon::join(
        || render_pages(original, page_numbers, options),
        || render_pages(processed, page_numbers, options),
    );
    let mut before = before?;
    let mut after = after?;

    let pages: BTreeSet<u32> = page_numbers.iter().copied().collect();
    Ok(pages
        .into_iter()
        .filter_map(|page_number| {
            Some(PreviewPair {
                page_number,
                original: before.remove(&page_number)?,
                processed: after.remove(&page_number)?,
            })
        })
        .collect())
}

/// Write preview pairs as `page-NNN-original.EXT` / `page-NNN-processed.EXT`.
pub fn write_previews(
    pairs: &[PreviewPair],
    dir: &Path,
    format: PreviewFormat,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let extension = format.extension();

    let mut written = Vec::with_capacity(pairs.len() * 2);
    for pair in pairs {
        for (label, data) in [("original", &pair.original), ("processed", &pair.processed)] {
            let path = dir.join(format!("page-{:03}-{}.{}", pair.page_number, label, extension));
            std::fs::write(&path, data)?;
            written.push(path);
        }
    }
    log::info!("Wrote {} preview image(s) to {}", written.len(), dir.display());
    Ok(written)
}

/// Group non-contiguous page numbers into minimal contiguous ranges.
///
/// E.g., `[1, 2, 3, 7, 8, 12]` → `[(1, 3), (7, 8), (12, 12)]`
pub fn contiguous_ranges(pages: &[u32]) -> Vec<(u32, u32)> {
    if pages.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<u32> = pages.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges = Vec::new();
    let mut start = sorted[0];
    let mut end = sorted[0];

    for &p in &sorted[1..] {
        if p == end + 1 {
            end = p;
        } else {
            ranges.push((start, end));
            start = p;
            end = p;
        }
    }
    ranges.push((start, end));

    ranges
}

/// Find the rendered file for a page. pdftoppm zero-pads page numbers to the
/// width of the document's last page number, which we do not know here.
pub fn find_rendered_page(dir: &Path, page_num: u32, extension: &str) -> Option<PathBuf> {
    (1..=6)
        .map(|width| dir.join(format!("page-{:0>width$}.{}", page_num, extension, width = width)))
        .find(|path| path.exists())
}
