use image::Rgba;

use crate::{
    Bitmap, CANVAS_HEIGHT, CANVAS_WIDTH,
    glyphs::{GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH, glyph5x7, text_width},
};

const MAX_FONT_SIZE: f32 = 120.0;
const FONT_TO_HEIGHT: f32 = 0.28;
const LINE_SPACING: f32 = 1.15;
const SIDE_MARGIN: u32 = 40;
/// Font size to glyph cell size; a 5x7 glyph then fills roughly one em.
const CELLS_PER_EM: f32 = 10.0;

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Layout parameters derived from the canvas height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextLayout {
    pub font_size: f32,
    pub line_height: f32,
    pub scale: u32,
    pub max_width: u32,
}

impl TextLayout {
    pub fn for_canvas(width: u32, height: u32) -> Self {
        let font_size = MAX_FONT_SIZE.min(height as f32 * FONT_TO_HEIGHT);

        Self {
            font_size,
            line_height: font_size * LINE_SPACING,
            scale: ((font_size / CELLS_PER_EM).round() as u32).max(1),
            max_width: width.saturating_sub(SIDE_MARGIN),
        }
    }
}

/// Rasterizes `prompt` black on white at the logical canvas size.
pub fn render_reference(prompt: &str) -> Bitmap {
    render_reference_sized(prompt, CANVAS_WIDTH, CANVAS_HEIGHT)
}

pub fn render_reference_sized(prompt: &str, width: u32, height: u32) -> Bitmap {
    let mut bitmap = Bitmap::from_pixel(width, height, PAPER);
    let layout = TextLayout::for_canvas(width, height);

    let lines = wrap_lines(prompt.trim(), layout.max_width, layout.scale);
    let block_height = lines.len() as f32 * layout.line_height;
    let start_y = height as f32 / 2.0 - block_height / 2.0 + layout.line_height / 2.0;

    for (index, line) in lines.iter().enumerate() {
        let center_y = start_y + index as f32 * layout.line_height;
        draw_line_centered(&mut bitmap, line, width as f32 / 2.0, center_y, layout.scale);
    }

    bitmap
}

/// Greedy word wrap: a word moves to the next line once the line would exceed
/// `max_width`. The first word always stays on the first line, however long.
pub fn wrap_lines(text: &str, max_width: u32, scale: u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for (index, word) in text.split(' ').enumerate() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };

        if text_width(&candidate, scale) > max_width && index > 0 {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        } else {
            line = candidate;
        }
    }

    lines.push(line);
    lines
}

fn draw_line_centered(bitmap: &mut Bitmap, line: &str, center_x: f32, center_y: f32, scale: u32) {
    let left = (center_x - text_width(line, scale) as f32 / 2.0).round() as i64;
    let top = (center_y - (GLYPH_HEIGHT * scale) as f32 / 2.0).round() as i64;

    for (index, ch) in line.chars().enumerate() {
        let x = left + (index as u32 * GLYPH_ADVANCE * scale) as i64;

        if let Some(rows) = glyph5x7(ch) {
            draw_glyph(bitmap, &rows, x, top, scale);
        }
    }
}

fn draw_glyph(bitmap: &mut Bitmap, rows: &[u8; 7], x: i64, y: i64, scale: u32) {
    for (row_index, row_bits) in rows.iter().enumerate() {
        for column in 0..GLYPH_WIDTH {
            if row_bits & (1 << (GLYPH_WIDTH - 1 - column)) == 0 {
                continue;
            }

            let cell_x = x + (column * scale) as i64;
            let cell_y = y + (row_index as u32 * scale) as i64;
            fill_cell(bitmap, cell_x, cell_y, scale);
        }
    }
}

fn fill_cell(bitmap: &mut Bitmap, x: i64, y: i64, scale: u32) {
    let (width, height) = bitmap.dimensions();

    for py in y..y + scale as i64 {
        for px in x..x + scale as i64 {
            if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                continue;
            }
            bitmap.put_pixel(px as u32, py as u32, INK);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ink::{InkMask, REFERENCE_INK};

    fn ink_bounds(bitmap: &Bitmap) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;

        for (x, y, pixel) in bitmap.enumerate_pixels() {
            if !REFERENCE_INK.is_ink(pixel) {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }

        bounds
    }

    #[test]
    fn test_layout_for_logical_canvas() {
        let layout = TextLayout::for_canvas(CANVAS_WIDTH, CANVAS_HEIGHT);

        assert!((layout.font_size - 100.8).abs() < 0.001);
        assert_eq!(layout.scale, 10);
        assert_eq!(layout.max_width, 860);
    }

    #[test]
    fn test_empty_prompt_renders_nothing() {
        let bitmap = render_reference("");

        assert_eq!(bitmap.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));
        assert_eq!(InkMask::from_bitmap(&bitmap, REFERENCE_INK).count(), 0);
        assert_eq!(render_reference("   ").as_raw(), bitmap.as_raw());
    }

    #[test]
    fn test_single_letter_is_centered() {
        let bitmap = render_reference("I");
        let (x0, y0, x1, y1) = ink_bounds(&bitmap).unwrap();

        // 'I' spans columns 1..=3 of its cell and all 7 rows
        assert_eq!(x1 - x0 + 1, 30);
        assert_eq!(y1 - y0 + 1, 70);

        let center_x = (x0 + x1) as f32 / 2.0;
        let center_y = (y0 + y1) as f32 / 2.0;
        assert!((center_x - 450.0).abs() <= 1.0, "center_x {center_x}");
        assert!((center_y - 180.0).abs() <= 1.0, "center_y {center_y}");
    }

    #[test]
    fn test_wrap_lines() {
        // 14 glyphs fit in 860px at scale 10
        assert_eq!(wrap_lines("cat", 860, 10), vec!["cat"]);
        assert_eq!(
            wrap_lines("the quick brown fox", 860, 10),
            vec!["the quick", "brown fox"]
        );
        assert_eq!(wrap_lines("abcdefghijklmnopq", 860, 10).len(), 1);
    }

    #[test]
    fn test_wrapped_prompt_uses_two_rows() {
        let one_line = ink_bounds(&render_reference("cat")).unwrap();
        let two_lines = ink_bounds(&render_reference("the quick brown fox")).unwrap();

        assert!(two_lines.3 - two_lines.1 > one_line.3 - one_line.1);
    }

    #[test]
    fn test_unknown_characters_are_blank() {
        let bitmap = render_reference("€€");
        assert_eq!(InkMask::from_bitmap(&bitmap, REFERENCE_INK).count(), 0);
    }
}
