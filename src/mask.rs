//! Window shape extraction: render at 1-bit depth, then turn set bits into
//! a banded list of rectangles.

use log::debug;
use tiny_skia::Pixmap;

use crate::byte_order::BitOrder;
use crate::canvas::{Canvas, Operator};
use crate::geometry::{Rect, Region};

/// Alpha at or above this counts as opaque in a 1-bit raster.
const A1_THRESHOLD: u8 = 0x80;

/// Packed 1-bit raster, rows padded to 32-bit words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Raster {
    width: usize,
    height: usize,
    stride: usize,
    bit_order: BitOrder,
    data: Vec<u8>,
}

impl A1Raster {
    pub fn new(width: usize, height: usize, bit_order: BitOrder) -> Self {
        let stride = width.div_ceil(32) * 4;
        A1Raster { width, height, stride, bit_order, data: vec![0; stride * height] }
    }

    /// Threshold the alpha channel of `pixmap`.
    pub fn from_alpha(pixmap: &Pixmap, bit_order: BitOrder) -> Self {
        let width = pixmap.width() as usize;
        let mut raster = A1Raster::new(width, pixmap.height() as usize, bit_order);
        for (i, px) in pixmap.pixels().iter().enumerate() {
            if px.alpha() >= A1_THRESHOLD {
                raster.set(i % width, i / width, true);
            }
        }
        raster
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn bit_order(&self) -> BitOrder {
        self.bit_order
    }

    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        let mask = self.bit_order.mask(x % 8);
        let byte = &mut self.data[y * self.stride + x / 8];
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.stride + x / 8] & self.bit_order.mask(x % 8) != 0
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.stride..(y + 1) * self.stride]
    }
}

/// Run-length state for one raster row.
struct RowScanner {
    running: bool,
    span_start: usize,
}

impl RowScanner {
    fn new() -> Self {
        RowScanner { running: false, span_start: 0 }
    }

    fn push(&mut self, x: usize, bit: bool, spans: &mut Vec<(i32, i32)>) {
        if bit == self.running {
            return;
        }
        if self.running {
            spans.push((self.span_start as i32, x as i32));
        } else {
            self.span_start = x;
        }
        self.running = bit;
    }

    fn finish(self, width: usize, spans: &mut Vec<(i32, i32)>) {
        if self.running {
            spans.push((self.span_start as i32, width as i32));
        }
    }
}

/// Collect the runs of set bits in one packed row as `[x0, x1)` spans.
///
/// Bytes that lie fully inside the row and match the current run are skipped
/// whole.
pub fn scan_row(row: &[u8], width: usize, bit_order: BitOrder, spans: &mut Vec<(i32, i32)>) {
    spans.clear();
    let mut scanner = RowScanner::new();
    let mut x = 0;
    while x < width {
        let byte = row[x / 8];
        let uniform = if scanner.running { 0xff } else { 0x00 };
        if x + 8 <= width && byte == uniform {
            x += 8;
            continue;
        }
        for bit in 0..8 {
            if x >= width {
                break;
            }
            scanner.push(x, byte & bit_order.mask(bit) != 0, spans);
            x += 1;
        }
    }
    scanner.finish(width, spans);
}

/// Non-overlapping rectangles covering exactly the set bits of `raster`.
pub fn extract_rects(raster: &A1Raster) -> Vec<Rect> {
    let mut region = Region::new();
    let mut spans = Vec::new();
    for y in 0..raster.height() {
        scan_row(raster.row(y), raster.width(), raster.bit_order(), &mut spans);
        region.union_row(y as i32, &spans);
    }
    region.into_rects()
}

/// Run `paint` with the [`Operator::Source`] operator on a transparent
/// `width` x `height` canvas and threshold the result to one bit.
///
/// `None` when either dimension is zero.
pub fn render_a1(width: u32, height: u32, bit_order: BitOrder, paint: impl FnOnce(&mut Canvas)) -> Option<A1Raster> {
    let mut pixmap = Pixmap::new(width, height)?;
    {
        let mut canvas = Canvas::new(&mut pixmap);
        canvas.set_operator(Operator::Source);
        paint(&mut canvas);
    }
    Some(A1Raster::from_alpha(&pixmap, bit_order))
}

/// Render with `paint` and return the window shape as rectangles.
pub fn shape_rects(width: u32, height: u32, bit_order: BitOrder, paint: impl FnOnce(&mut Canvas)) -> Vec<Rect> {
    let Some(raster) = render_a1(width, height, bit_order, paint) else {
        return Vec::new();
    };
    let rects = extract_rects(&raster);
    debug!("shape {width}x{height}: {} rects", rects.len());
    rects
}
