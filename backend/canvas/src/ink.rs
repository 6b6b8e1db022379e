//! Ink classification.
//!
//! A pixel is ink when it is opaque enough and darker than the background. The
//! reference and the candidate use different luminance cut-offs: rendered text is solid
//! black, while composited strokes may be any non-white color.
use image::Rgba;

use crate::Bitmap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InkThreshold {
    pub min_alpha: u8,
    pub max_luminance: f32,
}

pub const REFERENCE_INK: InkThreshold = InkThreshold {
    min_alpha: 50,
    max_luminance: 200.0,
};

pub const CANDIDATE_INK: InkThreshold = InkThreshold {
    min_alpha: 50,
    max_luminance: 250.0,
};

/// Rec. 601 luma.
pub fn luminance(pixel: &Rgba<u8>) -> f32 {
    0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32
}

impl InkThreshold {
    pub fn is_ink(&self, pixel: &Rgba<u8>) -> bool {
        pixel[3] > self.min_alpha && luminance(pixel) < self.max_luminance
    }
}

/// Boolean ink grid derived from a bitmap, row-major.
#[derive(Debug, Clone)]
pub struct InkMask {
    pub width: u32,
    pub height: u32,
    pub ink: Vec<bool>,
}

impl InkMask {
    pub fn from_bitmap(bitmap: &Bitmap, threshold: InkThreshold) -> Self {
        let (width, height) = bitmap.dimensions();
        let ink = bitmap.pixels().map(|pixel| threshold.is_ink(pixel)).collect();

        Self { width, height, ink }
    }

    pub fn count(&self) -> usize {
        self.ink.iter().filter(|&&ink| ink).count()
    }
}
