//! Local preview tool — renders theme backgrounds, shape masks and text icons
//! to PNG files. No X11 needed.
//!
//! Usage: cargo run --bin preview [-- --theme NAME]
//!
//! Without `--theme`, a demo theme is generated under
//! `preview-output/data/themes/demo` and rendered.
//!
//! Outputs:
//!   preview-output/background-WxH.png  — nine-patch background at several sizes
//!   preview-output/mask-WxH.png        — shape mask (white = inside)
//!   preview-output/text-N.png          — tray text icons
//!   preview-output/atlas.png           — single tiled overview

use std::path::{Path, PathBuf};

use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Shader, Transform};

use panel_theme::canvas::Canvas;
use panel_theme::config::{Gravity, Margin, ThemeConfig, TrayConfig};
use panel_theme::geometry::Rect;
use panel_theme::paths::{DataDirs, IconTheme};
use panel_theme::theme::Theme;

const SIZES: &[(u32, u32)] = &[(120, 40), (320, 64), (64, 160), (24, 24)];
const LABELS: &[&str] = &["us", "en-US", "pinyin", "中文", "fr-tg", "mon-a1"];
const ICON_SIZE: u32 = 48;

const DEMO_CONF: &str = r##"
[metadata]
name = "demo"
description = "Generated preview theme"

[input_panel]
blur_mask = "panel.png"
enable_blur = true

[input_panel.background]
image = "panel.png"
overlay = "badge.png"
gravity = "top_right"
overlay_offset_x = 4
overlay_offset_y = 4
hide_overlay_if_oversize = true

[input_panel.background.margin]
top = 8
bottom = 8
left = 8
right = 8

[input_panel.background.overlay_clip_margin]
top = 2
bottom = 2
left = 2
right = 2
"##;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let out = PathBuf::from("preview-output");
    std::fs::create_dir_all(&out).unwrap();

    let requested = std::env::args().skip_while(|a| a != "--theme").nth(1);
    let icons = Box::new(IconTheme::from_env("hicolor"));
    let tray = TrayConfig { prefer_text_icon: true, ..TrayConfig::default() };

    let mut theme = match &requested {
        Some(name) => {
            let mut theme = Theme::new(DataDirs::from_env(), icons, tray);
            theme.load(name).expect("failed to load theme");
            theme
        }
        None => {
            let data = out.join("data");
            write_demo_theme(&data.join("themes/demo"));
            let mut theme = Theme::new(DataDirs::new(Some(data), Vec::new()), icons, tray);
            theme.load("demo").expect("failed to load demo theme");
            theme
        }
    };
    println!("theme: {}", theme.name());

    let mut all_frames: Vec<(String, Pixmap)> = Vec::new();
    let background = theme.config().input_panel.background.clone();

    // ── Backgrounds and their masks ─────────────────────────
    for &(w, h) in SIZES {
        let mut pixmap = Pixmap::new(w, h).unwrap();
        {
            let mut canvas = Canvas::new(&mut pixmap);
            theme.paint_background(&mut canvas, &background, w as i32, h as i32, 1.0);
        }
        let label = format!("background-{w}x{h}");
        save_pixmap(&out.join(format!("{label}.png")), &pixmap);
        all_frames.push((label, pixmap));

        let rects = theme.mask(&background, w as i32, h as i32);
        let mask = mask_image(&rects, w, h);
        let label = format!("mask-{w}x{h}");
        save_pixmap(&out.join(format!("{label}.png")), &mask);
        println!("{label}: {} rects", rects.len());
        all_frames.push((label, mask));
    }

    // ── Text icons ──────────────────────────────────────────
    for (i, label) in LABELS.iter().enumerate() {
        let icon = theme.load_image("input-keyboard", label, ICON_SIZE, true).image().clone();
        let name = format!("text-{i}");
        let pixmap = icon.into_pixmap();
        save_pixmap(&out.join(format!("{name}.png")), &pixmap);
        println!("{name}: {label:?}");
        all_frames.push((name, pixmap));
    }

    // ── Build atlas ─────────────────────────────────────────
    let cols = 4_u32;
    let cell = 330_u32;
    let pad = 8_u32;
    let rows = (all_frames.len() as u32).div_ceil(cols);
    let atlas_w = cols * (cell + pad) + pad;
    let atlas_h = rows * (cell / 2 + pad) + pad;

    let mut atlas = Pixmap::new(atlas_w, atlas_h).unwrap();
    atlas.fill(tiny_skia::Color::from_rgba8(30, 30, 46, 255));
    for (idx, (_label, frame)) in all_frames.iter().enumerate() {
        let col = idx as u32 % cols;
        let row = idx as u32 / cols;
        let ox = pad + col * (cell + pad);
        let oy = pad + row * (cell / 2 + pad);
        atlas.draw_pixmap(
            ox as i32,
            oy as i32,
            frame.as_ref(),
            &tiny_skia::PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    let atlas_path = out.join("atlas.png");
    save_pixmap(&atlas_path, &atlas);
    println!("\natlas: {} ({}x{}, {} frames)", atlas_path.display(), atlas_w, atlas_h, all_frames.len());
    println!("individual frames in {}/", out.display());
}

/// Write `theme.conf` plus a rounded panel image and a badge.
fn write_demo_theme(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("theme.conf"), DEMO_CONF).unwrap();

    let mut panel = Pixmap::new(32, 32).unwrap();
    fill_rounded(&mut panel, 0.0, 0.0, 32.0, 32.0, 8.0, [40, 44, 60, 255]);
    fill_rounded(&mut panel, 2.0, 2.0, 28.0, 28.0, 6.0, [236, 239, 244, 255]);
    save_pixmap(&dir.join("panel.png"), &panel);

    let mut badge = Pixmap::new(10, 10).unwrap();
    fill_rounded(&mut badge, 0.0, 0.0, 10.0, 10.0, 5.0, [220, 80, 60, 255]);
    save_pixmap(&dir.join("badge.png"), &badge);

    // Sanity check the generated config before the theme reads it.
    let config = ThemeConfig::from_toml(DEMO_CONF).unwrap();
    assert_eq!(config.input_panel.background.gravity, Gravity::TopRight);
    assert_eq!(config.input_panel.background.margin, Margin::uniform(8));
}

fn fill_rounded(pixmap: &mut Pixmap, x: f32, y: f32, w: f32, h: f32, radius: f32, rgba: [u8; 4]) {
    let r = radius.min(w / 2.0).min(h / 2.0).max(0.0);
    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(x + w - r, y);
    pb.quad_to(x + w, y, x + w, y + r);
    pb.line_to(x + w, y + h - r);
    pb.quad_to(x + w, y + h, x + w - r, y + h);
    pb.line_to(x + r, y + h);
    pb.quad_to(x, y + h, x, y + h - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);
    pb.close();
    let Some(path) = pb.finish() else { return };
    let paint = Paint {
        shader: Shader::SolidColor(tiny_skia::Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])),
        anti_alias: true,
        ..Paint::default()
    };
    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
}

/// White where the shape is, transparent elsewhere.
fn mask_image(rects: &[Rect], w: u32, h: u32) -> Pixmap {
    let mut pixmap = Pixmap::new(w, h).unwrap();
    let paint = Paint {
        shader: Shader::SolidColor(tiny_skia::Color::WHITE),
        ..Paint::default()
    };
    for r in rects {
        if let Some(rect) = tiny_skia::Rect::from_xywh(r.x as f32, r.y as f32, r.width as f32, r.height as f32) {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }
    pixmap
}

fn save_pixmap(path: &Path, pixmap: &Pixmap) {
    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    save_rgba_png(path, pixmap.width(), pixmap.height(), &rgba);
}

fn save_rgba_png(path: &Path, w: u32, h: u32, rgba: &[u8]) {
    let file = std::fs::File::create(path).expect("create png");
    let buf = std::io::BufWriter::new(file);
    let mut encoder = png::Encoder::new(buf, w, h);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().expect("png header");
    writer.write_image_data(rgba).expect("png data");
}
