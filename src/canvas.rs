//! A small drawing context over a [`tiny_skia::Pixmap`].
//!
//! Tracks a translate/scale transform, a device-space clip rectangle and the
//! compositing operator. State changes are scoped with [`Canvas::save`], which
//! hands back a guard that restores the previous state when dropped.

use std::ops::{Deref, DerefMut};

use tiny_skia::{BlendMode, FilterQuality, Paint, Pattern, Pixmap, SpreadMode, Transform};

use crate::surface::Surface;

/// How source pixels combine with the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    /// Normal alpha compositing.
    #[default]
    Over,
    /// Replace the target inside the painted area.
    Source,
}

impl Operator {
    fn blend_mode(self) -> BlendMode {
        match self {
            Operator::Over => BlendMode::SourceOver,
            Operator::Source => BlendMode::Source,
        }
    }
}

/// Sampling used when a painted surface is scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Bilinear,
}

impl Filter {
    fn quality(self) -> FilterQuality {
        match self {
            Filter::Nearest => FilterQuality::Nearest,
            Filter::Bilinear => FilterQuality::Bilinear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Clip {
    Unbounded,
    Rect(tiny_skia::Rect),
    Empty,
}

#[derive(Debug, Clone, Copy)]
struct State {
    transform: Transform,
    clip: Clip,
    operator: Operator,
}

pub struct Canvas<'a> {
    target: &'a mut Pixmap,
    state: State,
}

impl<'a> Canvas<'a> {
    pub fn new(target: &'a mut Pixmap) -> Self {
        Canvas {
            target,
            state: State {
                transform: Transform::identity(),
                clip: Clip::Unbounded,
                operator: Operator::Over,
            },
        }
    }

    pub fn width(&self) -> u32 {
        self.target.width()
    }

    pub fn height(&self) -> u32 {
        self.target.height()
    }

    /// Snapshot the current state; it comes back when the guard drops.
    pub fn save(&mut self) -> SaveGuard<'_, 'a> {
        let saved = self.state;
        SaveGuard { canvas: self, saved }
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.state.transform = self.state.transform.pre_translate(dx, dy);
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.state.transform = self.state.transform.pre_scale(sx, sy);
    }

    pub fn transform(&self) -> Transform {
        self.state.transform
    }

    pub fn operator(&self) -> Operator {
        self.state.operator
    }

    pub fn set_operator(&mut self, operator: Operator) {
        self.state.operator = operator;
    }

    /// Intersect the clip with a rectangle given in user space.
    pub fn clip_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let device = tiny_skia::Rect::from_xywh(x, y, width, height)
            .and_then(|r| r.transform(self.state.transform))
            .filter(|r| r.width() > 0.0 && r.height() > 0.0);
        self.state.clip = match (self.state.clip, device) {
            (Clip::Empty, _) | (_, None) => Clip::Empty,
            (Clip::Unbounded, Some(r)) => Clip::Rect(r),
            (Clip::Rect(current), Some(r)) => current
                .intersect(&r)
                .filter(|r| r.width() > 0.0 && r.height() > 0.0)
                .map_or(Clip::Empty, Clip::Rect),
        };
    }

    /// Paint `surface` with its origin at `(x, y)` in user space, multiplied
    /// by `alpha`, limited to the clip.
    ///
    /// Nothing is sampled outside the surface's footprint: there the source
    /// counts as transparent, so [`Operator::Over`] leaves the target alone
    /// and [`Operator::Source`] clears it.
    pub fn paint_surface(&mut self, surface: &Surface, x: f32, y: f32, alpha: f32, filter: Filter) {
        if alpha <= 0.0 {
            return;
        }
        let source_ts = self.state.transform.pre_translate(x, y);
        let bounds = tiny_skia::Rect::from_xywh(0.0, 0.0, self.width() as f32, self.height() as f32);
        let clip = match self.state.clip {
            Clip::Empty => return,
            Clip::Rect(r) => bounds.and_then(|b| r.intersect(&b)),
            Clip::Unbounded => bounds,
        };
        let Some(clip) = clip.filter(|r| r.width() > 0.0 && r.height() > 0.0) else {
            return;
        };

        if self.state.operator == Operator::Source {
            let clear = Paint {
                blend_mode: BlendMode::Clear,
                anti_alias: false,
                ..Paint::default()
            };
            self.target.fill_rect(clip, &clear, Transform::identity(), None);
        }

        let Some(area) = tiny_skia::Rect::from_xywh(0.0, 0.0, surface.width() as f32, surface.height() as f32)
            .and_then(|r| r.transform(source_ts))
            .and_then(|footprint| footprint.intersect(&clip))
            .filter(|r| r.width() > 0.0 && r.height() > 0.0)
        else {
            return;
        };

        let paint = Paint {
            shader: Pattern::new(
                surface.pixmap().as_ref(),
                SpreadMode::Pad,
                filter.quality(),
                alpha.min(1.0),
                source_ts,
            ),
            blend_mode: self.state.operator.blend_mode(),
            anti_alias: false,
            ..Paint::default()
        };
        self.target.fill_rect(area, &paint, Transform::identity(), None);
    }
}

/// Restores the canvas state it was created from when dropped.
pub struct SaveGuard<'g, 'a> {
    canvas: &'g mut Canvas<'a>,
    saved: State,
}

impl<'a> Deref for SaveGuard<'_, 'a> {
    type Target = Canvas<'a>;

    fn deref(&self) -> &Self::Target {
        &*self.canvas
    }
}

impl<'a> DerefMut for SaveGuard<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.canvas
    }
}

impl Drop for SaveGuard<'_, '_> {
    fn drop(&mut self) {
        self.canvas.state = self.saved;
    }
}
