//! Stroke capture and candidate preparation.
//!
//! Strokes are stamped as round-capped capsules onto a transparent bitmap. The eraser
//! clears pixels back to transparent instead of painting white, so erased areas behave
//! like untouched paper once composited.
use image::{DynamicImage, Rgba, imageops::FilterType};
use serde::{Deserialize, Serialize};

use crate::{Bitmap, CANVAS_HEIGHT, CANVAS_WIDTH};

const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Pen,
    Eraser,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

pub struct DrawingCanvas {
    image: Bitmap,
    pub tool: Tool,
    pub color: Rgba<u8>,
    pub size: f32,
    last_point: Option<Point>,
}

impl Default for DrawingCanvas {
    fn default() -> Self {
        Self::new(CANVAS_WIDTH, CANVAS_HEIGHT)
    }
}

impl DrawingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: Bitmap::from_pixel(width, height, CLEAR),
            tool: Tool::Pen,
            color: Rgba([0, 0, 0, 255]),
            size: 6.0,
            last_point: None,
        }
    }

    pub fn image(&self) -> &Bitmap {
        &self.image
    }

    /// Pointer down: a single click still leaves a dot.
    pub fn begin(&mut self, point: Point) {
        self.stroke_segment(point, point);
        self.last_point = Some(point);
    }

    /// Pointer move while drawing; ignored when no stroke is active.
    pub fn extend(&mut self, point: Point) {
        if let Some(last) = self.last_point {
            self.stroke_segment(last, point);
            self.last_point = Some(point);
        }
    }

    pub fn end(&mut self) {
        self.last_point = None;
    }

    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = CLEAR;
        }
        self.last_point = None;
    }

    /// Paints every pixel whose center lies within `size / 2` of the segment.
    pub fn stroke_segment(&mut self, from: Point, to: Point) {
        let radius = (self.size / 2.0).max(0.5);
        let paint = match self.tool {
            Tool::Pen => self.color,
            Tool::Eraser => CLEAR,
        };

        let (width, height) = self.image.dimensions();
        let min_x = (from.x.min(to.x) - radius).floor().max(0.0) as u32;
        let min_y = (from.y.min(to.y) - radius).floor().max(0.0) as u32;
        let max_x = ((from.x.max(to.x) + radius).ceil().max(0.0) as u32).min(width);
        let max_y = ((from.y.max(to.y) + radius).ceil().max(0.0) as u32).min(height);

        for y in min_y..max_y {
            for x in min_x..max_x {
                let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);

                if distance_to_segment(center, from, to) <= radius {
                    self.image.put_pixel(x, y, paint);
                }
            }
        }
    }

    /// The drawing over a white background, as the scorer expects it.
    pub fn composite(&self) -> Bitmap {
        composite_on_white(&self.image)
    }
}

fn distance_to_segment(point: Point, from: Point, to: Point) -> f32 {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let length_squared = dx * dx + dy * dy;

    let t = if length_squared == 0.0 {
        0.0
    } else {
        (((point.x - from.x) * dx + (point.y - from.y) * dy) / length_squared).clamp(0.0, 1.0)
    };

    let (nearest_x, nearest_y) = (from.x + t * dx, from.y + t * dy);
    ((point.x - nearest_x).powi(2) + (point.y - nearest_y).powi(2)).sqrt()
}

/// Source-over blend of every pixel onto opaque white.
pub fn composite_on_white(drawing: &Bitmap) -> Bitmap {
    let mut output = Bitmap::from_pixel(drawing.width(), drawing.height(), WHITE);

    for (out, source) in output.pixels_mut().zip(drawing.pixels()) {
        let alpha = source[3] as u32;

        for channel in 0..3 {
            let blended = (source[channel] as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
            out[channel] = blended as u8;
        }
    }

    output
}

/// Scales an uploaded drawing to the logical canvas and composites it onto white.
///
/// Browsers export the canvas at device-pixel resolution, so a 2x display uploads
/// 1800x720; the comparison always happens at 900x360.
pub fn prepare_candidate(drawing: DynamicImage) -> Bitmap {
    let mut rgba = drawing.to_rgba8();

    if rgba.dimensions() != (CANVAS_WIDTH, CANVAS_HEIGHT) {
        rgba = image::imageops::resize(&rgba, CANVAS_WIDTH, CANVAS_HEIGHT, FilterType::Triangle);
    }

    composite_on_white(&rgba)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accuracy::compare,
        ink::{CANDIDATE_INK, InkMask},
        white_canvas,
    };

    fn ink_count(bitmap: &Bitmap) -> usize {
        InkMask::from_bitmap(bitmap, CANDIDATE_INK).count()
    }

    #[test]
    fn test_untouched_canvas_composites_to_white() {
        let canvas = DrawingCanvas::default();
        assert_eq!(canvas.composite().as_raw(), white_canvas().as_raw());
    }

    #[test]
    fn test_click_leaves_a_dot() {
        let mut canvas = DrawingCanvas::default();
        canvas.begin(Point::new(100.0, 100.0));
        canvas.end();

        let inked = ink_count(&canvas.composite());
        // disc of radius 3: roughly 28 pixels
        assert!((20..=40).contains(&inked), "{inked}");
    }

    #[test]
    fn test_horizontal_stroke_width() {
        let mut canvas = DrawingCanvas::default();
        canvas.size = 4.0;
        canvas.begin(Point::new(10.0, 50.0));
        canvas.extend(Point::new(110.0, 50.0));
        canvas.end();

        let image = canvas.image();
        let column: Vec<u32> = (0..100).filter(|&y| image.get_pixel(60, y)[3] == 255).collect();
        assert_eq!(column, vec![48, 49, 50, 51]);
    }

    #[test]
    fn test_extend_without_begin_is_ignored() {
        let mut canvas = DrawingCanvas::default();
        canvas.extend(Point::new(40.0, 40.0));

        assert_eq!(ink_count(&canvas.composite()), 0);
    }

    #[test]
    fn test_eraser_restores_paper() {
        let mut canvas = DrawingCanvas::default();
        canvas.size = 10.0;
        canvas.begin(Point::new(100.0, 100.0));
        canvas.extend(Point::new(200.0, 100.0));
        canvas.end();
        assert!(ink_count(&canvas.composite()) > 0);

        canvas.tool = Tool::Eraser;
        canvas.size = 30.0;
        canvas.begin(Point::new(90.0, 100.0));
        canvas.extend(Point::new(210.0, 100.0));
        canvas.end();

        assert_eq!(ink_count(&canvas.composite()), 0);
    }

    #[test]
    fn test_clear() {
        let mut canvas = DrawingCanvas::default();
        canvas.begin(Point::new(5.0, 5.0));
        canvas.clear();

        assert_eq!(ink_count(&canvas.composite()), 0);
    }

    #[test]
    fn test_strokes_near_the_edge_are_clipped() {
        let mut canvas = DrawingCanvas::default();
        canvas.size = 20.0;
        canvas.begin(Point::new(-5.0, -5.0));
        canvas.extend(Point::new(905.0, 365.0));

        assert!(ink_count(&canvas.composite()) > 0);
    }

    #[test]
    fn test_composite_blends_alpha() {
        let mut drawing = Bitmap::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let half = composite_on_white(&drawing);
        assert_eq!(half.get_pixel(0, 0), &Rgba([127, 127, 127, 255]));

        drawing.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        assert_eq!(composite_on_white(&drawing).get_pixel(0, 0), &WHITE);
    }

    #[test]
    fn test_prepare_candidate_downscales_hidpi_drawings() {
        let mut hidpi = Bitmap::from_pixel(CANVAS_WIDTH * 2, CANVAS_HEIGHT * 2, CLEAR);
        for y in 200..240 {
            for x in 200..240 {
                hidpi.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }

        let candidate = prepare_candidate(DynamicImage::ImageRgba8(hidpi));
        assert_eq!(candidate.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));

        let mut reference = white_canvas();
        for y in 100..120 {
            for x in 100..120 {
                reference.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }

        let accuracy = compare(&reference, &candidate).unwrap();
        assert_eq!(accuracy.coverage, 1.0);
        assert!(accuracy.score >= 90, "{}", accuracy.score);
    }

    #[test]
    fn test_drawn_prompt_scores_against_reference() {
        let reference = crate::render_reference("I");

        let mut canvas = DrawingCanvas::default();
        canvas.size = 10.0;
        // trace the stem of the rendered 'I' (x 445..455, y 155..205)
        canvas.begin(Point::new(450.0, 150.0));
        canvas.extend(Point::new(450.0, 210.0));
        canvas.end();

        let accuracy = compare(&reference, &canvas.composite()).unwrap();
        assert!(accuracy.score > 0);
        assert!(accuracy.coverage < 1.0);
    }
}
