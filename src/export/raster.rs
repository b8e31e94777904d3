//! HTML to bitmap
//!
//! Export snapshots the preview through an external renderer
//! (`wkhtmltoimage` by default) at twice the preview width.

use crate::error::{KitError, Result};
use crate::utils::{stderr_tail, ScratchDir};
use image::DynamicImage;
use std::process::Command;
use tracing::debug;

/// Snapshot scale relative to CSS pixels
pub const RASTER_SCALE: u32 = 2;

pub trait Rasterizer {
    /// Render an HTML document `width_px` CSS pixels wide into one image.
    fn rasterize(&self, html: &str, width_px: u32) -> Result<DynamicImage>;
}

/// Runs a wkhtmltoimage-compatible command line.
pub struct CommandRasterizer {
    program: String,
    scale: u32,
}

impl CommandRasterizer {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            scale: RASTER_SCALE,
        }
    }

    pub fn from_settings() -> Self {
        Self::new(&crate::settings::get_rasterizer())
    }
}

impl Rasterizer for CommandRasterizer {
    fn rasterize(&self, html: &str, width_px: u32) -> Result<DynamicImage> {
        let scratch = ScratchDir::new("casekit-raster")?;
        let input = scratch.path().join("preview.html");
        let output = scratch.path().join("preview.png");
        std::fs::write(&input, html)?;

        debug!(program = %self.program, width_px, "Rasterizing preview");
        let result = Command::new(&self.program)
            .arg("--quiet")
            .arg("--enable-local-file-access")
            .args(["--zoom", &self.scale.to_string()])
            .args(["--width", &(width_px * self.scale).to_string()])
            .args(["--format", "png"])
            .arg(&input)
            .arg(&output)
            .output()
            .map_err(|e| KitError::Rasterize(format!("could not run {}: {}", self.program, e)))?;

        if !result.status.success() {
            return Err(KitError::Rasterize(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                stderr_tail(&result.stderr)
            )));
        }
        if !output.exists() {
            return Err(KitError::Rasterize(format!("{} produced no image", self.program)));
        }

        let image = image::open(&output)
            .map_err(|e| KitError::Rasterize(format!("unreadable snapshot: {}", e)))?;
        Ok(image)
    }
}
