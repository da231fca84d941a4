//! Rasterised similarity labels ("80%").
//!
//! Glyphs come from a built-in 5x7 bitmap font covering digits and the few
//! symbols a percentage needs. Unknown characters render as blank cells.

use image::{Rgba, RgbaImage};

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
/// Blank columns between glyphs, in font pixels.
const GLYPH_SPACING: u32 = 1;
/// Transparent border around the text, in font pixels.
const PADDING: u32 = 1;

/// Rows of a glyph, most significant of the low five bits is the left column.
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '%' => [0x18, 0x19, 0x02, 0x04, 0x08, 0x13, 0x03],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        _ => return None,
    };
    Some(rows)
}

/// Pixel size of `text` rendered at `scale` screen pixels per font pixel.
pub fn label_dimensions(text: &str, scale: u32) -> (u32, u32) {
    let scale = scale.max(1);
    let glyphs = text.chars().count() as u32;
    let cells = if glyphs == 0 {
        0
    } else {
        glyphs * GLYPH_WIDTH + (glyphs - 1) * GLYPH_SPACING
    };
    (
        (cells + 2 * PADDING) * scale,
        (GLYPH_HEIGHT + 2 * PADDING) * scale,
    )
}

/// Render `text` in `color` on a transparent background.
pub fn rasterize_label(text: &str, scale: u32, color: [u8; 4]) -> RgbaImage {
    let scale = scale.max(1);
    let (width, height) = label_dimensions(text, scale);
    let mut image = RgbaImage::new(width, height);

    for (index, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else {
            continue;
        };
        let origin_x = PADDING + index as u32 * (GLYPH_WIDTH + GLYPH_SPACING);
        for (row, bits) in rows.iter().enumerate() {
            for column in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - column)) == 0 {
                    continue;
                }
                let x0 = (origin_x + column) * scale;
                let y0 = (PADDING + row as u32) * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        image.put_pixel(x0 + dx, y0 + dy, Rgba(color));
                    }
                }
            }
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn lit_pixels(image: &RgbaImage) -> usize {
        image.pixels().filter(|p| p[3] > 0).count()
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(label_dimensions("80%", 1), (3 * 5 + 2 + 2, 9));
        assert_eq!(label_dimensions("80%", 3), (57, 27));
        assert_eq!(label_dimensions("", 2), (4, 18));
    }

    #[test]
    fn test_rasterize_draws_glyphs() {
        let image = rasterize_label("1", 1, WHITE);
        assert_eq!(image.dimensions(), (7, 9));
        // Stem of the "1" in the middle column.
        assert_eq!(image.get_pixel(3, 4), &Rgba(WHITE));
        // Padding stays transparent.
        assert_eq!(image.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_scale_multiplies_coverage() {
        let small = lit_pixels(&rasterize_label("42%", 1, WHITE));
        let large = lit_pixels(&rasterize_label("42%", 2, WHITE));
        assert!(small > 0);
        assert_eq!(large, small * 4);
    }

    #[test]
    fn test_unknown_characters_are_blank() {
        let image = rasterize_label("?", 1, WHITE);
        assert_eq!(lit_pixels(&image), 0);
        assert_eq!(image.dimensions(), label_dimensions("?", 1));
    }
}
