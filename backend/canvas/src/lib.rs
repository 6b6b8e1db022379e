//! # Canvas
//!
//! Drawing-accuracy scoring for the level 2 writing exercise.
//!
//! A student copies a word or phrase onto a fixed 900×360 canvas. The drawing is
//! composited onto white, the prompt is rasterized into a reference bitmap of the same
//! size, and both are reduced to ink masks and compared pixel by pixel.
//!
//! ## Pipeline
//! - [`strokes::DrawingCanvas`] records pen/eraser strokes on a transparent bitmap
//! - [`strokes::prepare_candidate`] brings any uploaded drawing to the logical size
//!   and composites it onto white
//! - [`reference::render_reference`] rasterizes the prompt with the built-in font
//! - [`accuracy::compare`] produces coverage, IoU and the final 0-100 score
//!
//! ## Score
//! `round(100 * clamp(0.7 * coverage + 0.3 * iou, 0, 1))`, where coverage is the share
//! of reference ink reproduced and IoU penalizes stray strokes.
use image::{DynamicImage, ImageFormat, RgbaImage};

pub mod accuracy;
pub mod error;
pub mod glyphs;
pub mod ink;
pub mod reference;
pub mod strokes;

pub use accuracy::{Accuracy, Feedback, compare, score};
pub use error::CanvasError;
pub use reference::render_reference;
pub use strokes::{DrawingCanvas, Point, Tool, prepare_candidate};

pub const CANVAS_WIDTH: u32 = 900;
pub const CANVAS_HEIGHT: u32 = 360;

pub type Bitmap = RgbaImage;

/// Wraps a flat RGBA byte sequence, rejecting lengths other than `width * height * 4`.
pub fn bitmap_from_rgba(width: u32, height: u32, bytes: Vec<u8>) -> Result<Bitmap, CanvasError> {
    let actual = bytes.len();

    RgbaImage::from_raw(width, height, bytes).ok_or(CanvasError::BufferLength {
        width,
        height,
        actual,
    })
}

/// Decodes an uploaded PNG drawing.
pub fn decode_png(bytes: &[u8]) -> Result<DynamicImage, CanvasError> {
    Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?)
}

/// Scores a drawing of any size against the rendered `prompt`.
pub fn grade_drawing(prompt: &str, drawing: DynamicImage) -> Result<Accuracy, CanvasError> {
    let candidate = prepare_candidate(drawing);
    let reference = render_reference(prompt);

    compare(&reference, &candidate)
}

/// A blank white bitmap at the logical canvas size.
pub fn white_canvas() -> Bitmap {
    RgbaImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, image::Rgba([255, 255, 255, 255]))
}
