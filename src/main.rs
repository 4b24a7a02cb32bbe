//! panel-theme: themed input-method panel demo for X11
//!
//! Loads a theme from the data dirs, draws the input panel background with
//! its page arrows and a tray text icon, cuts the window to the theme's
//! shape and reloads whenever the theme files change.

mod watcher;
mod window;

use std::sync::mpsc;
use std::time::Duration;

use log::{error, info, warn};
use tiny_skia::Pixmap;

use panel_theme::canvas::{Canvas, Filter};
use panel_theme::config::TrayConfig;
use panel_theme::paths::{DataDirs, IconTheme};
use panel_theme::surface::Surface;
use panel_theme::theme::Theme;

const DEFAULT_WIDTH: u16 = 360;
const DEFAULT_HEIGHT: u16 = 64;
const TRAY_ICON_SIZE: u32 = 24;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let theme_name = args.next().unwrap_or_else(|| "default".to_string());
    let width = args.next().and_then(|a| a.parse().ok()).unwrap_or(DEFAULT_WIDTH);
    let height = args.next().and_then(|a| a.parse().ok()).unwrap_or(DEFAULT_HEIGHT);

    let data_dirs = DataDirs::from_env();
    let icon_theme_name = std::env::var("PANEL_THEME_ICON_THEME").unwrap_or_else(|_| "hicolor".to_string());
    let icons = IconTheme::from_env(icon_theme_name);
    let mut theme = Theme::new(data_dirs, Box::new(icons), TrayConfig::default());
    if let Err(e) = theme.load(&theme_name) {
        error!("Failed to load theme {theme_name}: {e}");
        std::process::exit(1);
    }

    let mut win = match window::PanelWindow::new(100, 100, width, height) {
        Ok(w) => w,
        Err(e) => {
            error!("Failed to create X11 window: {e}");
            std::process::exit(1);
        }
    };
    info!("X11 panel window created");

    let (tx, rx) = mpsc::channel::<watcher::ThemeChanged>();
    let dirs = theme.data_dirs().theme_dirs(&theme_name);
    if dirs.is_empty() {
        warn!("No directory for theme {theme_name}, live reload disabled");
    } else {
        std::thread::spawn(move || {
            if let Err(e) = watcher::watch_theme(&dirs, tx) {
                error!("Theme watcher error: {e}");
            }
        });
    }

    present(&mut theme, &mut win);
    win.show();

    loop {
        while let Ok(change) = rx.try_recv() {
            info!("Theme files changed: {:?}", change.paths);
            match theme.load(&theme_name) {
                Ok(()) => present(&mut theme, &mut win),
                Err(e) => warn!("Keeping previous theme: {e}"),
            }
        }
        win.poll_events();
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Render the panel and push pixels, shape and blur region to the window.
fn present(theme: &mut Theme, win: &mut window::PanelWindow) {
    let (width, height) = win.size();
    let surface = render_panel(theme, width as u32, height as u32);
    win.update_pixels(&surface);

    let background = theme.config().input_panel.background.clone();
    win.set_shape(&theme.mask(&background, width as i32, height as i32));

    let blur = if theme.config().input_panel.enable_blur {
        theme.blur_mask(width as i32, height as i32)
    } else {
        Vec::new()
    };
    win.set_blur_region(&blur);
}

fn render_panel(theme: &mut Theme, width: u32, height: u32) -> Surface {
    let Some(mut pixmap) = Pixmap::new(width.max(1), height.max(1)) else {
        return Surface::transparent(width, height);
    };
    let panel = theme.config().input_panel.clone();
    {
        let mut canvas = Canvas::new(&mut pixmap);
        theme.paint_background(&mut canvas, &panel.background, width as i32, height as i32, 1.0);

        // Page arrows sit at the right edge inside the content margin.
        let mut right = width as i32 - panel.content_margin.right;
        for action in [&panel.next_page, &panel.prev_page] {
            let image = theme.load_action(action);
            if !image.is_valid() {
                continue;
            }
            let (image_width, image_height) = (image.width() as i32, image.height() as i32);
            right -= image_width;
            let mut c = canvas.save();
            c.translate(right as f32, ((height as i32 - image_height) / 2) as f32);
            theme.paint_action(&mut c, action, 1.0);
        }

        let icon = theme.load_image("input-keyboard", "us", TRAY_ICON_SIZE, false).image().clone();
        let y = (height as i32 - TRAY_ICON_SIZE as i32) / 2;
        canvas.paint_surface(&icon, panel.content_margin.left as f32, y as f32, 1.0, Filter::Bilinear);
    }
    Surface::from_pixmap(pixmap, true)
}
