//! OCR fallback for scanned documents
//!
//! Pages are rendered to PNG with `pdftoppm` and read back with the
//! `tesseract` command line. Both sit behind traits so the pipeline can run
//! without the binaries installed.

use super::pdf_text::page_marker;
use crate::error::{KitError, Result};
use crate::utils::{stderr_tail, ScratchDir};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Render DPI: twice the 72 dpi PDF unit.
pub const RENDER_DPI: u32 = 144;

pub trait OcrEngine {
    /// Recognize the text in one image file.
    fn recognize(&self, image: &Path) -> Result<String>;
}

pub trait PageRenderer {
    /// Render page `page` (1-based) of `pdf` into `out_dir`, returning the image path.
    fn render_page(&self, pdf: &Path, page: usize, out_dir: &Path) -> Result<PathBuf>;
}

pub struct TesseractCli {
    language: String,
}

impl TesseractCli {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
        }
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &Path) -> Result<String> {
        let output = Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .map_err(|e| KitError::Ocr(format!("could not run tesseract: {}", e)))?;
        if !output.status.success() {
            return Err(KitError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr_tail(&output.stderr)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

pub struct PdftoppmRenderer {
    dpi: u32,
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self { dpi: RENDER_DPI }
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn render_page(&self, pdf: &Path, page: usize, out_dir: &Path) -> Result<PathBuf> {
        let prefix = out_dir.join(format!("page-{}", page));
        let page_arg = page.to_string();
        let output = Command::new("pdftoppm")
            .args(["-f", &page_arg, "-l", &page_arg])
            .args(["-r", &self.dpi.to_string()])
            .arg("-png")
            .arg("-singlefile")
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|e| KitError::Ocr(format!("could not run pdftoppm: {}", e)))?;
        if !output.status.success() {
            return Err(KitError::Ocr(format!(
                "pdftoppm failed on page {}: {}",
                page,
                stderr_tail(&output.stderr)
            )));
        }
        let image = prefix.with_extension("png");
        if !image.exists() {
            return Err(KitError::Ocr(format!("pdftoppm produced no image for page {}", page)));
        }
        Ok(image)
    }
}

/// Render and recognize every page, marking each one.
///
/// `progress` receives `start..=end` spread evenly over the pages.
pub fn ocr_pages(
    pdf_bytes: &[u8],
    page_count: usize,
    renderer: &dyn PageRenderer,
    engine: &dyn OcrEngine,
    progress: &mut dyn FnMut(u8),
    (start, end): (u8, u8),
) -> Result<String> {
    let scratch = ScratchDir::new("casekit-ocr")?;
    let pdf_path = scratch.path().join("source.pdf");
    std::fs::write(&pdf_path, pdf_bytes)?;

    let span = end.saturating_sub(start) as usize;
    let mut out = String::new();
    for page in 1..=page_count {
        let image = renderer.render_page(&pdf_path, page, scratch.path())?;
        let text = engine.recognize(&image)?;
        debug!(page, chars = text.chars().count(), "OCR page done");

        out.push_str("\n\n");
        out.push_str(&page_marker(page));
        out.push_str("\n\n");
        out.push_str(text.trim());

        let done = start as usize + span * page / page_count.max(1);
        progress(done.min(100) as u8);
    }
    Ok(out.trim().to_string())
}
