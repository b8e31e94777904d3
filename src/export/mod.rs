//! PDF export of a document preview
//!
//! render preview HTML -> rasterize -> slice into page bands -> assemble PDF.
//! Nothing is written unless every step succeeds; the file appears under its
//! final name only after a complete write.

pub mod filename;
pub mod pagination;
pub mod pdf;
pub mod raster;

pub use filename::export_filename;
pub use pagination::{PageLayout, PageSlice};
pub use pdf::assemble_pdf;
pub use raster::{CommandRasterizer, Rasterizer, RASTER_SCALE};

use crate::editor::DocumentEditor;
use crate::error::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub pages: usize,
    pub bytes: usize,
}

/// Export the editor's current state (saved or not) into `out_dir`.
pub fn export_document(
    editor: &DocumentEditor,
    rasterizer: &dyn Rasterizer,
    out_dir: &Path,
) -> Result<ExportReport> {
    let format = editor.format();
    let (width_px, _) = format.preview_px();
    let image = rasterizer.rasterize(editor.preview(), width_px)?;
    let (page_w, page_h) = format.page_size_pt();
    let layout = PageLayout::compute(image.width(), image.height(), page_w, page_h)?;
    let bytes = assemble_pdf(&image, &layout, editor.title())?;

    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(export_filename(editor.title()));
    let partial = path.with_extension("pdf.part");
    if let Err(e) = std::fs::write(&partial, &bytes).and_then(|_| std::fs::rename(&partial, &path)) {
        let _ = std::fs::remove_file(&partial);
        return Err(e.into());
    }

    info!(
        path = %path.display(),
        pages = layout.page_count(),
        format = format.label(),
        "Exported PDF"
    );
    Ok(ExportReport {
        path,
        pages: layout.page_count(),
        bytes: bytes.len(),
    })
}
