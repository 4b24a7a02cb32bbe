//! Integer rectangles and banded regions.

/// Integer rectangle, position plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect { x, y, width, height }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    /// Overlap of two rectangles; empty rectangles come back with zero size.
    pub fn intersected(&self, other: &Rect) -> Rect {
        let x1 = self.left().max(other.left());
        let y1 = self.top().max(other.top());
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            return Rect::new(x1, y1, 0, 0);
        }
        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.top() >= self.top()
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.left() && x < self.right() && y >= self.top() && y < self.bottom()
    }
}

/// A set of non-overlapping rectangles in y-x banded order.
///
/// Built one scanline at a time: each row contributes a sorted list of
/// horizontal spans. A row whose spans are identical to the previous band and
/// directly below it grows that band instead of starting a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    rects: Vec<Rect>,
    // Index into `rects` where the last band starts.
    band_start: usize,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn into_rects(self) -> Vec<Rect> {
        self.rects
    }

    /// Union the spans `[x0, x1)` of row `y` into the region.
    ///
    /// Rows must arrive in increasing `y`, spans sorted by `x0` and disjoint.
    pub fn union_row(&mut self, y: i32, spans: &[(i32, i32)]) {
        debug_assert!(spans.windows(2).all(|w| w[0].1 < w[1].0));
        if spans.is_empty() {
            return;
        }

        let band = &self.rects[self.band_start..];
        let coalesce = !band.is_empty()
            && band[0].bottom() == y
            && band.len() == spans.len()
            && band.iter().zip(spans).all(|(r, &(x0, x1))| r.left() == x0 && r.right() == x1);

        if coalesce {
            for r in &mut self.rects[self.band_start..] {
                r.height += 1;
            }
            return;
        }

        debug_assert!(band.is_empty() || band[0].bottom() <= y);
        self.band_start = self.rects.len();
        self.rects
            .extend(spans.iter().map(|&(x0, x1)| Rect::new(x0, y, x1 - x0, 1)));
    }
}
