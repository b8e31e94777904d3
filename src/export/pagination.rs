//! Slicing one tall bitmap into PDF pages
//!
//! The bitmap is scaled to the page width. With H the scaled image height and
//! P the page height there are ceil(H/P) pages; page i shows the band that
//! starts i*P points below the top of the image.

use crate::error::{KitError, Result};

/// Slack for float noise when H is an exact multiple of P.
const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSlice {
    pub index: usize,
    /// Distance from the top of the scaled image to the top of this page, in points
    pub offset_pt: f64,
    /// First source pixel row of the band
    pub src_y: u32,
    /// Number of source pixel rows in the band
    pub src_height: u32,
    /// Height the band occupies on the page, in points
    pub height_pt: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub page_width_pt: f64,
    pub page_height_pt: f64,
    /// Points per source pixel
    pub scale: f64,
    /// Full image height once scaled to the page width
    pub image_height_pt: f64,
    pub slices: Vec<PageSlice>,
}

impl PageLayout {
    pub fn compute(
        image_width_px: u32,
        image_height_px: u32,
        page_width_pt: f64,
        page_height_pt: f64,
    ) -> Result<Self> {
        if image_width_px == 0 || image_height_px == 0 {
            return Err(KitError::Rasterize("rendered image is empty".into()));
        }
        if page_width_pt <= 0.0 || page_height_pt <= 0.0 {
            return Err(KitError::Custom("page size must be positive".into()));
        }

        let scale = page_width_pt / image_width_px as f64;
        let image_height_pt = image_height_px as f64 * scale;
        let page_count = ((image_height_pt / page_height_pt) - EPSILON).ceil().max(1.0) as usize;
        let page_height_px = page_height_pt / scale;

        let mut slices = Vec::with_capacity(page_count);
        for index in 0..page_count {
            let src_y = ((index as f64 * page_height_px).floor() as u32).min(image_height_px - 1);
            let end = if index + 1 == page_count {
                image_height_px
            } else {
                (((index + 1) as f64 * page_height_px).floor() as u32).clamp(src_y + 1, image_height_px)
            };
            let src_height = end - src_y;
            slices.push(PageSlice {
                index,
                offset_pt: index as f64 * page_height_pt,
                src_y,
                src_height,
                height_pt: src_height as f64 * scale,
            });
        }

        Ok(Self {
            page_width_pt,
            page_height_pt,
            scale,
            image_height_pt,
            slices,
        })
    }

    pub fn page_count(&self) -> usize {
        self.slices.len()
    }
}
