//! Glyph rasterization shared by the layout engine and the compositor.
//!
//! TTF faces render through ab_glyph outline coverage, accumulated into the
//! target image with per-pixel alpha blending so edges stay smooth. The
//! built-in face integer-scales the Spleen 12x24 bitmap glyphs, which keeps
//! small monospace text crisp at label DPIs.

use ab_glyph::{Font, FontArc, ScaleFont};
use image::{Rgb, RgbImage};
use spleen_font::{FONT_12X24, PSF2Font};

use super::Face;

/// Native cell size of the built-in Spleen face.
const BUILTIN_WIDTH: u32 = 12;
const BUILTIN_HEIGHT: u32 = 24;

/// Integer scale factor mapping a pixel size onto the built-in 24px cell.
fn builtin_scale(px_size: f32) -> u32 {
    ((px_size / BUILTIN_HEIGHT as f32).round() as u32).max(1)
}

/// Measure a single line of text. Returns `(width, height)` in pixels.
pub fn measure(face: &Face, text: &str, px_size: f32) -> (u32, u32) {
    match face {
        Face::Ttf(font) => {
            let scaled = font.as_scaled(px_size);
            let width: f32 = text
                .chars()
                .map(|ch| scaled.h_advance(font.glyph_id(ch)))
                .sum();
            let height = (scaled.ascent() - scaled.descent()).ceil();
            (width.ceil().max(0.0) as u32, height.max(1.0) as u32)
        }
        Face::Builtin => {
            let scale = builtin_scale(px_size);
            let chars = text.chars().count() as u32;
            (chars * BUILTIN_WIDTH * scale, BUILTIN_HEIGHT * scale)
        }
    }
}

/// Line height of a face at the given pixel size.
pub fn line_height(face: &Face, px_size: f32) -> u32 {
    match face {
        Face::Ttf(font) => {
            let scaled = font.as_scaled(px_size);
            (scaled.ascent() - scaled.descent()).ceil().max(1.0) as u32
        }
        Face::Builtin => BUILTIN_HEIGHT * builtin_scale(px_size),
    }
}

/// Blend `color` over the existing pixel with the given coverage.
fn blend_pixel(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
        return;
    }
    let c = coverage.clamp(0.0, 1.0);
    let px = img.get_pixel_mut(x as u32, y as u32);
    for i in 0..3 {
        let bg = px.0[i] as f32;
        let fg = color.0[i] as f32;
        px.0[i] = (bg + (fg - bg) * c).round() as u8;
    }
}

/// Draw one line of text with its top-left corner at `(x, y)`.
pub fn draw(img: &mut RgbImage, face: &Face, text: &str, x: i32, y: i32, px_size: f32, color: Rgb<u8>) {
    match face {
        Face::Ttf(font) => draw_ttf(img, font, text, x, y, px_size, color),
        Face::Builtin => draw_builtin(img, text, x, y, px_size, color),
    }
}

fn draw_ttf(
    img: &mut RgbImage,
    font: &FontArc,
    text: &str,
    x: i32,
    y: i32,
    px_size: f32,
    color: Rgb<u8>,
) {
    let scaled = font.as_scaled(px_size);
    let baseline = y as f32 + scaled.ascent();
    let mut caret = x as f32;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        let glyph = glyph_id.with_scale_and_position(px_size, ab_glyph::point(caret, baseline));
        caret += scaled.h_advance(glyph_id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = gx as i32 + bounds.min.x as i32;
                let py = gy as i32 + bounds.min.y as i32;
                blend_pixel(img, px, py, color, coverage);
            });
        }
    }
}

fn draw_builtin(img: &mut RgbImage, text: &str, x: i32, y: i32, px_size: f32, color: Rgb<u8>) {
    let scale = builtin_scale(px_size);
    // Constant embedded font data, cannot fail to parse.
    let mut spleen = PSF2Font::new(FONT_12X24).unwrap();
    let mut caret = x;

    for ch in text.chars() {
        let mut buf = [0u8; 4];
        let encoded = ch.encode_utf8(&mut buf);

        match spleen.glyph_for_utf8(encoded.as_bytes()) {
            Some(glyph) => {
                for (row_y, row) in glyph.enumerate() {
                    for (col_x, on) in row.enumerate() {
                        if !on {
                            continue;
                        }
                        // Nearest-neighbor upscale of the bitmap cell.
                        for dy in 0..scale {
                            for dx in 0..scale {
                                let px = caret + (col_x as u32 * scale + dx) as i32;
                                let py = y + (row_y as u32 * scale + dy) as i32;
                                blend_pixel(img, px, py, color, 1.0);
                            }
                        }
                    }
                }
            }
            None => draw_missing_glyph_box(img, caret, y, scale, color),
        }
        caret += (BUILTIN_WIDTH * scale) as i32;
    }
}

/// Hollow box for characters the built-in face is missing.
fn draw_missing_glyph_box(img: &mut RgbImage, x: i32, y: i32, scale: u32, color: Rgb<u8>) {
    let w = (BUILTIN_WIDTH * scale) as i32;
    let h = (BUILTIN_HEIGHT * scale) as i32;
    let inset = scale as i32;
    for py in (y + inset)..(y + h - inset) {
        for px in (x + inset)..(x + w - inset) {
            let on_edge = py < y + 2 * inset
                || py >= y + h - 2 * inset
                || px < x + 2 * inset
                || px >= x + w - 2 * inset;
            if on_edge {
                blend_pixel(img, px, py, color, 1.0);
            }
        }
    }
}
