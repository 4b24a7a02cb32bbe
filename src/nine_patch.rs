//! Nine-patch stretching of theme backgrounds and overlay placement.
//!
//! The source image is split by its margins into a 3x3 grid:
//!
//! ```text
//! 7 8 9
//! 4 5 6
//! 1 2 3
//! ```
//!
//! Corners are copied at native size, edges 8/2 stretch horizontally, edges
//! 4/6 vertically, and the center both ways.

use crate::canvas::{Canvas, Filter, Operator};
use crate::config::{BackgroundImageConfig, Margin};
use crate::geometry::Rect;
use crate::surface::Surface;

/// One of the nine paint steps, in canvas user space.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Patch {
    translate: (f32, f32),
    scale: (f32, f32),
    source: (f32, f32),
    clip: (f32, f32),
    filter: Filter,
}

impl Patch {
    fn fixed(translate: (i32, i32), source: (i32, i32), clip: (i32, i32)) -> Self {
        Patch {
            translate: (translate.0 as f32, translate.1 as f32),
            scale: (1.0, 1.0),
            source: (source.0 as f32, source.1 as f32),
            clip: (clip.0 as f32, clip.1 as f32),
            filter: Filter::Bilinear,
        }
    }

    fn scaled(mut self, sx: f64, sy: f64) -> Self {
        self.scale = (sx as f32, sy as f32);
        self
    }

    fn nearest(mut self) -> Self {
        self.filter = Filter::Nearest;
        self
    }
}

/// Background geometry once negative target sizes have been resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Layout {
    width: i32,
    height: i32,
    resize_width: i32,
    resize_height: i32,
    target_resize_width: i32,
    target_resize_height: i32,
    scale_x: f64,
    scale_y: f64,
}

impl Layout {
    fn new(image: &Surface, cfg: &BackgroundImageConfig, width: i32, height: i32) -> Self {
        let m = &cfg.margin;
        let resize_width = (image.width() as i32 - m.left - m.right).max(1);
        let resize_height = (image.height() as i32 - m.top - m.bottom).max(1);
        let width = if width < 0 { resize_width } else { width };
        let height = if height < 0 { resize_height } else { height };
        let target_resize_width = width - m.left - m.right;
        let target_resize_height = height - m.top - m.bottom;
        Layout {
            width,
            height,
            resize_width,
            resize_height,
            target_resize_width,
            target_resize_height,
            scale_x: target_resize_width as f64 / resize_width as f64,
            scale_y: target_resize_height as f64 / resize_height as f64,
        }
    }

    fn patches(&self, cfg: &BackgroundImageConfig) -> Vec<Patch> {
        let Margin { top, bottom, left, right } = cfg.margin;
        let (width, height) = (self.width, self.height);
        let (rw, rh) = (self.resize_width, self.resize_height);
        let mut patches = Vec::with_capacity(9);

        // Corners 1, 3, 7, 9.
        if left != 0 && bottom != 0 {
            patches.push(Patch::fixed((0, height - bottom), (0, -top - rh), (left, bottom)));
        }
        if right != 0 && bottom != 0 {
            patches.push(Patch::fixed(
                (width - right, height - bottom),
                (-left - rw, -top - rh),
                (right, bottom),
            ));
        }
        if left != 0 && top != 0 {
            patches.push(Patch::fixed((0, 0), (0, 0), (left, top)));
        }
        if right != 0 && top != 0 {
            patches.push(Patch::fixed((width - right, 0), (-left - rw, 0), (right, top)));
        }

        // Edges 8 and 2.
        if top != 0 && self.target_resize_width > 0 {
            patches.push(Patch::fixed((left, 0), (-left, 0), (rw, top)).scaled(self.scale_x, 1.0));
        }
        if bottom != 0 && self.target_resize_width > 0 {
            patches.push(
                Patch::fixed((left, height - bottom), (-left, -top - rh), (rw, bottom))
                    .scaled(self.scale_x, 1.0),
            );
        }

        // Edges 4 and 6.
        if left != 0 && self.target_resize_height > 0 {
            patches.push(Patch::fixed((0, top), (0, -top), (left, rh)).scaled(1.0, self.scale_y));
        }
        if right != 0 && self.target_resize_height > 0 {
            patches.push(
                Patch::fixed((width - right, top), (-left - rw, -top), (right, rh))
                    .scaled(1.0, self.scale_y),
            );
        }

        // Center 5. Nearest keeps small repeated patterns crisp.
        if self.target_resize_width > 0 && self.target_resize_height > 0 {
            patches.push(
                Patch::fixed((left, top), (-left, -top), (rw, rh))
                    .scaled(self.scale_x, self.scale_y)
                    .nearest(),
            );
        }

        patches
    }
}

/// Where an overlay lands on a background of a given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayPlacement {
    /// Full overlay rectangle.
    pub rect: Rect,
    /// Part of `rect` that survives the overlay clip.
    pub visible: Rect,
}

/// Resolve the overlay rectangle for a `width` x `height` background.
///
/// Returns `None` when nothing should be drawn: the clip area is empty, the
/// overlay misses it, or the overlay sticks out while
/// `hide_overlay_if_oversize` is set. The oversize check looks at the whole
/// overlay rectangle, not at what would remain after clipping.
pub fn overlay_placement(
    cfg: &BackgroundImageConfig,
    width: i32,
    height: i32,
    overlay_width: i32,
    overlay_height: i32,
) -> Option<OverlayPlacement> {
    let clip = &cfg.overlay_clip_margin;
    let clip_width = width - clip.left - clip.right;
    let clip_height = height - clip.top - clip.bottom;
    if clip_width <= 0 || clip_height <= 0 {
        return None;
    }
    let clip_rect = Rect::new(clip.left, clip.top, clip_width, clip_height);

    let x = cfg.gravity.horizontal().place(width, overlay_width, cfg.overlay_offset_x);
    let y = cfg.gravity.vertical().place(height, overlay_height, cfg.overlay_offset_y);
    let rect = Rect::new(x, y, overlay_width, overlay_height);

    let visible = rect.intersected(&clip_rect);
    if visible.is_empty() {
        return None;
    }
    if cfg.hide_overlay_if_oversize && !clip_rect.contains(&rect) {
        return None;
    }
    Some(OverlayPlacement { rect, visible })
}

/// Paint `image` stretched to `width` x `height`, then `overlay` on top.
///
/// A negative `width` or `height` selects the image's own stretchable size.
/// The background uses the canvas operator; the overlay is always composited
/// with [`Operator::Over`]. Steps whose geometry collapses are skipped.
pub fn paint_background(
    canvas: &mut Canvas,
    image: &Surface,
    overlay: Option<&Surface>,
    cfg: &BackgroundImageConfig,
    width: i32,
    height: i32,
    alpha: f32,
) {
    let layout = Layout::new(image, cfg, width, height);

    {
        let mut outer = canvas.save();
        for patch in layout.patches(cfg) {
            let mut c = outer.save();
            c.translate(patch.translate.0, patch.translate.1);
            c.scale(patch.scale.0, patch.scale.1);
            c.clip_rect(0.0, 0.0, patch.clip.0, patch.clip.1);
            c.paint_surface(image, patch.source.0, patch.source.1, alpha, patch.filter);
        }
    }

    let Some(overlay) = overlay else {
        return;
    };
    let Some(OverlayPlacement { rect, visible }) = overlay_placement(
        cfg,
        layout.width,
        layout.height,
        overlay.width() as i32,
        overlay.height() as i32,
    ) else {
        return;
    };

    let mut c = canvas.save();
    c.set_operator(Operator::Over);
    c.translate(visible.left() as f32, visible.top() as f32);
    c.clip_rect(0.0, 0.0, visible.width as f32, visible.height as f32);
    c.paint_surface(
        overlay,
        (rect.left() - visible.left()) as f32,
        (rect.top() - visible.top()) as f32,
        alpha,
        Filter::Bilinear,
    );
}

/// Paint an action image at its natural size from the canvas origin.
pub fn paint_action(canvas: &mut Canvas, image: &Surface, alpha: f32) {
    let mut c = canvas.save();
    c.clip_rect(0.0, 0.0, image.width() as f32, image.height() as f32);
    c.paint_surface(image, 0.0, 0.0, alpha, Filter::Bilinear);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Gravity;
    use tiny_skia::Pixmap;

    /// Opaque image where every pixel has a distinct color.
    fn pattern(width: u32, height: u32) -> Surface {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x * 23) as u8, (y * 29) as u8, ((x * 7 + y * 13) % 256) as u8, 255]);
            }
        }
        Surface::from_rows(width, height, 4, width as usize * 4, &data).unwrap()
    }

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Surface {
        let data: Vec<u8> = rgba.iter().copied().cycle().take((width * height * 4) as usize).collect();
        Surface::from_rows(width, height, 4, width as usize * 4, &data).unwrap()
    }

    fn px(pixmap: &Pixmap, x: i32, y: i32) -> [u8; 4] {
        let p = pixmap.pixel(x as u32, y as u32).unwrap();
        [p.red(), p.green(), p.blue(), p.alpha()]
    }

    fn src(surface: &Surface, x: i32, y: i32) -> [u8; 4] {
        px(surface.pixmap(), x, y)
    }

    fn render(
        image: &Surface,
        overlay: Option<&Surface>,
        cfg: &BackgroundImageConfig,
        width: u32,
        height: u32,
    ) -> Pixmap {
        let mut pixmap = Pixmap::new(width, height).unwrap();
        {
            let mut canvas = Canvas::new(&mut pixmap);
            canvas.set_operator(Operator::Source);
            paint_background(&mut canvas, image, overlay, cfg, width as i32, height as i32, 1.0);
        }
        pixmap
    }

    fn config(margin: Margin) -> BackgroundImageConfig {
        BackgroundImageConfig { margin, ..BackgroundImageConfig::default() }
    }

    #[test]
    fn corners_are_copied_verbatim() {
        let image = pattern(10, 9);
        let margin = Margin { top: 2, bottom: 3, left: 3, right: 2 };
        let cfg = config(margin);
        for (w, h) in [(25, 17), (5, 5), (40, 9)] {
            let out = render(&image, None, &cfg, w, h);
            let (w, h) = (w as i32, h as i32);
            for y in 0..margin.top {
                for x in 0..margin.left {
                    assert_eq!(px(&out, x, y), src(&image, x, y), "top-left {x},{y} at {w}x{h}");
                }
                for x in 0..margin.right {
                    assert_eq!(px(&out, w - margin.right + x, y), src(&image, 10 - margin.right + x, y));
                }
            }
            for y in 0..margin.bottom {
                for x in 0..margin.left {
                    assert_eq!(px(&out, x, h - margin.bottom + y), src(&image, x, 9 - margin.bottom + y));
                }
                for x in 0..margin.right {
                    assert_eq!(
                        px(&out, w - margin.right + x, h - margin.bottom + y),
                        src(&image, 10 - margin.right + x, 9 - margin.bottom + y)
                    );
                }
            }
        }
    }

    #[test]
    fn natural_size_reproduces_source() {
        let image = pattern(12, 10);
        let cfg = config(Margin { top: 3, bottom: 2, left: 4, right: 3 });
        let out = render(&image, None, &cfg, 12, 10);
        for y in 0..10 {
            for x in 0..12 {
                assert_eq!(px(&out, x, y), src(&image, x, y), "pixel {x},{y}");
            }
        }
    }

    #[test]
    fn center_scales_with_nearest_sampling() {
        // 1px margins around a 2x2 center of distinct colors.
        let image = pattern(4, 4);
        let cfg = config(Margin::uniform(1));
        let out = render(&image, None, &cfg, 6, 6);
        // Center doubles: each source pixel becomes a 2x2 block.
        for (sx, sy) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
            let expected = src(&image, sx, sy);
            let (dx, dy) = (1 + (sx - 1) * 2, 1 + (sy - 1) * 2);
            for (ox, oy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                assert_eq!(px(&out, dx + ox, dy + oy), expected);
            }
        }
    }

    #[test]
    fn negative_size_uses_stretchable_region() {
        let image = pattern(10, 10);
        let cfg = config(Margin::uniform(2));
        let layout = Layout::new(&image, &cfg, -1, -1);
        assert_eq!((layout.width, layout.height), (6, 6));
        assert_eq!((layout.target_resize_width, layout.target_resize_height), (2, 2));
    }

    #[test]
    fn image_smaller_than_margins_clamps_to_one_pixel() {
        let image = pattern(4, 4);
        let cfg = config(Margin::uniform(3));
        let layout = Layout::new(&image, &cfg, 10, 10);
        assert_eq!((layout.resize_width, layout.resize_height), (1, 1));
        assert_eq!(layout.scale_x, 4.0);
        let _ = render(&image, None, &cfg, 10, 10);
    }

    #[test]
    fn small_image_leaves_far_edges_transparent() {
        let image = solid(6, 6, [255, 0, 0, 255]);
        let cfg = config(Margin::uniform(3));
        let pixmap = render(&image, None, &cfg, 10, 10);
        for i in 0..10 {
            assert_eq!(px(&pixmap, 9, i)[3], 0, "column 9, row {i}");
            assert_eq!(px(&pixmap, i, 9)[3], 0, "row 9, column {i}");
        }
        assert_eq!(px(&pixmap, 0, 0), [255, 0, 0, 255]);
        assert_eq!(px(&pixmap, 8, 8), [255, 0, 0, 255]);

        let rects = crate::mask::shape_rects(10, 10, crate::byte_order::BitOrder::native(), |canvas| {
            paint_background(canvas, &image, None, &cfg, 10, 10, 1.0)
        });
        assert!(rects.iter().any(|r| r.contains_point(8, 8)));
        assert!(!rects.iter().any(|r| r.contains_point(9, 0) || r.contains_point(0, 9)));
    }

    #[test]
    fn target_smaller_than_margins_skips_stretched_parts() {
        let image = pattern(10, 10);
        let cfg = config(Margin::uniform(4));
        let layout = Layout::new(&image, &cfg, 6, 6);
        let patches = layout.patches(&cfg);
        assert_eq!(patches.len(), 4);
        assert!(patches.iter().all(|p| p.scale == (1.0, 1.0)));
    }

    #[test]
    fn zero_margins_paint_center_only() {
        let image = pattern(5, 5);
        let cfg = config(Margin::default());
        let layout = Layout::new(&image, &cfg, 20, 20);
        let patches = layout.patches(&cfg);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].filter, Filter::Nearest);
        assert_eq!(patches[0].scale, (4.0, 4.0));
    }

    #[test]
    fn bottom_right_overlay_aligns_with_corner() {
        let cfg = BackgroundImageConfig { gravity: Gravity::BottomRight, ..config(Margin::uniform(1)) };
        let placement = overlay_placement(&cfg, 40, 30, 6, 4).unwrap();
        assert_eq!(placement.rect, Rect::new(34, 26, 6, 4));
        assert_eq!(placement.rect.right(), 40);
        assert_eq!(placement.rect.bottom(), 30);
        assert_eq!(placement.visible, placement.rect);

        let background = solid(4, 4, [0, 0, 255, 255]);
        let badge = solid(6, 4, [255, 0, 0, 255]);
        let out = render(&background, Some(&badge), &cfg, 40, 30);
        assert_eq!(px(&out, 39, 29), [255, 0, 0, 255]);
        assert_eq!(px(&out, 34, 26), [255, 0, 0, 255]);
        assert_eq!(px(&out, 33, 29), [0, 0, 255, 255]);
        assert_eq!(px(&out, 39, 25), [0, 0, 255, 255]);
    }

    #[test]
    fn gravity_offsets_push_inward() {
        let base = config(Margin::default());
        let cases = [
            (Gravity::TopLeft, (2, 3)),
            (Gravity::TopCenter, (17 + 2, 3)),
            (Gravity::TopRight, (34 - 2, 3)),
            (Gravity::CenterLeft, (2, 13 + 3)),
            (Gravity::Center, (19, 16)),
            (Gravity::CenterRight, (32, 16)),
            (Gravity::BottomLeft, (2, 26 - 3)),
            (Gravity::BottomCenter, (19, 23)),
            (Gravity::BottomRight, (32, 23)),
        ];
        for (gravity, (x, y)) in cases {
            let cfg = BackgroundImageConfig { gravity, overlay_offset_x: 2, overlay_offset_y: 3, ..base.clone() };
            let placement = overlay_placement(&cfg, 40, 30, 6, 4).unwrap();
            assert_eq!((placement.rect.x, placement.rect.y), (x, y), "{gravity:?}");
        }
    }

    #[test]
    fn overlay_is_cropped_to_clip_margin() {
        let cfg = BackgroundImageConfig {
            overlay_clip_margin: Margin::uniform(5),
            overlay_offset_x: 2,
            overlay_offset_y: 2,
            ..config(Margin::default())
        };
        let placement = overlay_placement(&cfg, 40, 30, 10, 10).unwrap();
        assert_eq!(placement.rect, Rect::new(2, 2, 10, 10));
        assert_eq!(placement.visible, Rect::new(5, 5, 7, 7));

        let background = solid(4, 4, [0, 0, 255, 255]);
        let badge = pattern(10, 10);
        let out = render(&background, Some(&badge), &cfg, 40, 30);
        // Cropped overlay keeps its alignment: target (5,5) shows badge (3,3).
        assert_eq!(px(&out, 5, 5), src(&badge, 3, 3));
        assert_eq!(px(&out, 11, 11), src(&badge, 9, 9));
        assert_eq!(px(&out, 4, 5), [0, 0, 255, 255]);
    }

    #[test]
    fn empty_clip_area_skips_overlay() {
        let cfg = BackgroundImageConfig {
            overlay_clip_margin: Margin { top: 0, bottom: 0, left: 20, right: 20 },
            ..config(Margin::default())
        };
        assert!(overlay_placement(&cfg, 40, 30, 4, 4).is_none());
    }

    #[test]
    fn overlay_outside_clip_is_skipped() {
        let cfg = BackgroundImageConfig { overlay_offset_x: 50, ..config(Margin::default()) };
        assert!(overlay_placement(&cfg, 40, 30, 4, 4).is_none());
    }

    #[test]
    fn oversized_overlay_is_hidden() {
        let cfg = BackgroundImageConfig {
            hide_overlay_if_oversize: true,
            gravity: Gravity::Center,
            ..config(Margin::uniform(1))
        };
        let background = pattern(6, 6);
        let badge = solid(50, 8, [255, 0, 0, 255]);
        assert!(overlay_placement(&cfg, 40, 30, 50, 8).is_none());

        let plain = render(&background, None, &cfg, 40, 30);
        let with_badge = render(&background, Some(&badge), &cfg, 40, 30);
        assert!(plain == with_badge);

        let shown = BackgroundImageConfig { hide_overlay_if_oversize: false, ..cfg };
        let cropped = render(&background, Some(&badge), &shown, 40, 30);
        assert!(plain != cropped);
    }

    #[test]
    fn overlay_composites_over_background() {
        let cfg = config(Margin::default());
        let background = solid(2, 2, [0, 0, 255, 255]);
        let badge = solid(2, 2, [0, 0, 0, 0]);
        let out = render(&background, Some(&badge), &cfg, 8, 8);
        assert_eq!(px(&out, 0, 0), [0, 0, 255, 255]);
    }

    #[test]
    fn action_paints_at_natural_size() {
        let image = solid(3, 2, [0, 255, 0, 255]);
        let mut pixmap = Pixmap::new(6, 6).unwrap();
        {
            let mut canvas = Canvas::new(&mut pixmap);
            paint_action(&mut canvas, &image, 1.0);
        }
        assert_eq!(px(&pixmap, 2, 1), [0, 255, 0, 255]);
        assert_eq!(px(&pixmap, 3, 1), [0, 0, 0, 0]);
        assert_eq!(px(&pixmap, 2, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn alpha_scales_every_part() {
        let image = solid(4, 4, [255, 255, 255, 255]);
        let cfg = config(Margin::uniform(1));
        let mut pixmap = Pixmap::new(8, 8).unwrap();
        {
            let mut canvas = Canvas::new(&mut pixmap);
            paint_background(&mut canvas, &image, None, &cfg, 8, 8, 0.5);
        }
        for (x, y) in [(0, 0), (4, 0), (0, 4), (4, 4), (7, 7)] {
            let a = px(&pixmap, x, y)[3];
            assert!((126..=129).contains(&a), "alpha {a} at {x},{y}");
        }
    }
}
