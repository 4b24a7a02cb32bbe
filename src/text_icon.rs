//! Text fallback icons: a short abbreviation of a label drawn centered in a
//! square, optionally with an outline.

use std::path::Path;

use log::{debug, warn};
use unicode_width::UnicodeWidthChar;

use crate::byte_order::mul_div_255;
use crate::config::Color;
use crate::surface::Surface;

/// Labels are cut down to this many terminal cells.
const MAX_LABEL_WIDTH: usize = 3;

/// ASCII whitespace, vertical tab included. Unicode spaces such as U+3000
/// stay part of the label.
const LABEL_WHITESPACE: &[char] = &[' ', '\t', '\n', '\x0b', '\x0c', '\r'];

/// Display cells taken by `c`: 0 for zero-width, 2 for wide, otherwise 1.
/// Control characters count as one cell.
pub fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(1)
}

fn is_label_separator(c: char) -> bool {
    LABEL_WHITESPACE.contains(&c) || matches!(c, '-' | '_' | '/' | '|')
}

/// Abbreviate a label to its first token, at most three cells wide.
///
/// Layout names such as `fr-tg` or `mon-a1` keep only the part before the
/// separator. Returns the text and its width in cells.
pub fn extract_text_for_label(label: &str) -> (String, usize) {
    let Some(token) = label.split(is_label_separator).find(|t| !t.is_empty()) else {
        return (String::new(), 0);
    };

    let mut text = String::new();
    let mut width = 0;
    for c in token.chars() {
        let w = char_width(c);
        if width + w > MAX_LABEL_WIDTH {
            break;
        }
        text.push(c);
        width += w;
    }
    (text, width)
}

/// Font size for a label of `text_width` cells in a `size` square.
pub fn font_pixel_size(size: u32, text_width: usize) -> u32 {
    let scale = if text_width >= 3 { 2.0 / text_width as f64 } else { 1.0 };
    ((size as f64 * 0.75 * scale) as u32).max(1)
}

/// Outline stroke width for a given font size.
pub fn outline_width(pixel_size: u32) -> u32 {
    ((pixel_size + 4) / 8).min(4)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextIconStyle {
    pub text_color: Color,
    /// Fully transparent disables the outline.
    pub outline_color: Color,
}

pub fn load_font(path: &Path) -> Option<fontdue::Font> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            warn!("Failed to read tray font {}: {e}", path.display());
            return None;
        }
    };
    match fontdue::Font::from_bytes(data, fontdue::FontSettings::default()) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!("Failed to parse tray font {}: {e}", path.display());
            None
        }
    }
}

/// Single-channel coverage buffer positioned in surface coordinates.
struct Coverage {
    x: i32,
    y: i32,
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Coverage {
    fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return 0;
        }
        self.data[y as usize * self.width + x as usize]
    }

    /// Grow the coverage by `radius` pixels, as a stroke of twice that width
    /// centered on the glyph edge would.
    fn dilate(&self, radius: f32) -> Coverage {
        let reach = radius.ceil() as i32 + 1;
        let width = self.width + reach as usize * 2;
        let height = self.height + reach as usize * 2;
        let mut data = vec![0u8; width * height];
        for oy in 0..height as i32 {
            for ox in 0..width as i32 {
                let (cx, cy) = (ox - reach, oy - reach);
                let mut best = 0.0f32;
                for dy in -reach..=reach {
                    for dx in -reach..=reach {
                        let c = self.get(cx + dx, cy + dy);
                        if c == 0 {
                            continue;
                        }
                        let dist = ((dx * dx + dy * dy) as f32).sqrt();
                        let weight = (radius + 1.0 - dist).clamp(0.0, 1.0);
                        best = best.max(c as f32 * weight);
                    }
                }
                data[oy as usize * width + ox as usize] = best.round() as u8;
            }
        }
        Coverage { x: self.x - reach, y: self.y - reach, width, height, data }
    }
}

/// Rasterize `text` on one line and return its ink coverage, with the ink
/// box's top-left at `(0, 0)`. `None` if nothing is drawn.
fn rasterize_line(font: &fontdue::Font, text: &str, pixel_size: f32) -> Option<Coverage> {
    let mut glyphs = Vec::new();
    let mut pen = 0.0f32;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
    for ch in text.chars() {
        let (metrics, bitmap) = font.rasterize(ch, pixel_size);
        let gx = pen.round() as i32 + metrics.xmin;
        // Baseline at y = 0, y grows downwards.
        let gy = -metrics.ymin - metrics.height as i32;
        pen += metrics.advance_width;
        if metrics.width == 0 || metrics.height == 0 {
            continue;
        }
        min_x = min_x.min(gx);
        min_y = min_y.min(gy);
        max_x = max_x.max(gx + metrics.width as i32);
        max_y = max_y.max(gy + metrics.height as i32);
        glyphs.push((gx, gy, metrics.width, bitmap));
    }
    if glyphs.is_empty() {
        return None;
    }

    let width = (max_x - min_x) as usize;
    let height = (max_y - min_y) as usize;
    let mut data = vec![0u8; width * height];
    for (gx, gy, glyph_width, bitmap) in glyphs {
        for (row, line) in bitmap.chunks(glyph_width).enumerate() {
            let y = (gy - min_y) as usize + row;
            let start = y * width + (gx - min_x) as usize;
            for (dst, &src) in data[start..start + glyph_width].iter_mut().zip(line) {
                *dst = (*dst).max(src);
            }
        }
    }
    Some(Coverage { x: 0, y: 0, width, height, data })
}

/// Composite `color` through `coverage` onto premultiplied RGBA `pixels`.
fn blend_coverage(pixels: &mut [u8], surface_width: u32, surface_height: u32, coverage: &Coverage, color: Color) {
    let (sw, sh) = (surface_width as i32, surface_height as i32);
    for row in 0..coverage.height as i32 {
        let y = coverage.y + row;
        if y < 0 || y >= sh {
            continue;
        }
        for col in 0..coverage.width as i32 {
            let x = coverage.x + col;
            if x < 0 || x >= sw {
                continue;
            }
            let c = coverage.data[row as usize * coverage.width + col as usize];
            let a = mul_div_255(color.a, c);
            if a == 0 {
                continue;
            }
            let inv = 255 - a;
            let idx = (y * sw + x) as usize * 4;
            let px = &mut pixels[idx..idx + 4];
            px[0] = mul_div_255(color.r, a) + mul_div_255(px[0], inv);
            px[1] = mul_div_255(color.g, a) + mul_div_255(px[1], inv);
            px[2] = mul_div_255(color.b, a) + mul_div_255(px[2], inv);
            px[3] = a + mul_div_255(px[3], inv);
        }
    }
}

/// Draw the abbreviation of `label` centered in a `size` x `size` surface.
///
/// Centering uses the ink box of the rendered glyphs. Without a font, or
/// when the label has nothing printable, the result is fully transparent.
pub fn draw_text_icon(font: Option<&fontdue::Font>, label: &str, size: u32, style: &TextIconStyle) -> Surface {
    let mut surface = Surface::transparent(size, size);
    let Some(font) = font else {
        return surface;
    };
    let (text, text_width) = extract_text_for_label(label);
    if text.is_empty() {
        return surface;
    }

    let pixel_size = font_pixel_size(size, text_width);
    let Some(mut fill) = rasterize_line(font, &text, pixel_size as f32) else {
        return surface;
    };
    fill.x = ((size as f32 - fill.width as f32) * 0.5).floor() as i32;
    fill.y = ((size as f32 - fill.height as f32) * 0.5).floor() as i32;

    let (width, height) = (surface.width(), surface.height());
    let pixels = surface.pixmap_mut().data_mut();
    let line_width = outline_width(pixel_size);
    if style.outline_color.a != 0 && line_width != 0 {
        let outline = fill.dilate(line_width as f32 / 2.0);
        blend_coverage(pixels, width, height, &outline, style.outline_color);
    }
    blend_coverage(pixels, width, height, &fill, style.text_color);
    debug!("text icon {text:?} at {size}px, font {pixel_size}px");
    surface
}
