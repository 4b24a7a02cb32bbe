//! The theme façade: configuration, image caches and the paint and mask
//! entrypoints used by panel windows.

use std::path::PathBuf;

use log::{debug, info, warn};

use crate::byte_order::BitOrder;
use crate::cache::ImageCache;
use crate::canvas::Canvas;
use crate::config::{ActionImageConfig, BackgroundImageConfig, ThemeConfig, TrayConfig};
use crate::error::Result;
use crate::geometry::Rect;
use crate::mask;
use crate::nine_patch;
use crate::paths::{theme_relative, DataDirs, IconLookup};
use crate::surface::Surface;
use crate::text_icon::{self, TextIconStyle};

/// Name of the per-theme configuration file.
pub const THEME_CONF: &str = "theme.conf";

/// A decoded (or generated) image owned by a theme cache.
#[derive(Debug, Clone)]
pub struct ThemeImage {
    image: Surface,
    overlay: Option<Surface>,
    valid: bool,
    procedural: bool,
    size: u32,
}

impl ThemeImage {
    fn background(dirs: &DataDirs, theme: &str, cfg: &BackgroundImageConfig) -> Self {
        let image = load_theme_file(dirs, theme, &cfg.image);
        let overlay = load_theme_file(dirs, theme, &cfg.overlay);
        let valid = image.is_some();
        let (image, procedural) = match image {
            Some(image) => (image, false),
            None => (
                Surface::solid_background(&cfg.margin, cfg.border_width, cfg.border_color, cfg.color),
                true,
            ),
        };
        ThemeImage { size: image.width().max(image.height()), image, overlay, valid, procedural }
    }

    fn action(dirs: &DataDirs, theme: &str, cfg: &ActionImageConfig) -> Self {
        match load_theme_file(dirs, theme, &cfg.image) {
            Some(image) => ThemeImage {
                size: image.width().max(image.height()),
                image,
                overlay: None,
                valid: true,
                procedural: false,
            },
            None => ThemeImage {
                image: Surface::transparent(1, 1),
                overlay: None,
                valid: false,
                procedural: false,
                size: 0,
            },
        }
    }

    fn tray(
        icons: &dyn IconLookup,
        font: Option<&fontdue::Font>,
        tray: &TrayConfig,
        request: &TrayRequest,
    ) -> Self {
        let from_icon = if request.prefer_text || request.icon.is_empty() {
            None
        } else {
            icons.find_icon(request.icon, request.size, 1).and_then(|path| {
                Surface::load_with_size(&path, Some(request.size))
                    .map_err(|e| warn!("Failed to load icon {}: {e}", path.display()))
                    .ok()
            })
        };
        let (image, valid) = match from_icon {
            Some(image) => (image, true),
            None => {
                let style = TextIconStyle { text_color: tray.text_color, outline_color: tray.outline_color };
                (text_icon::draw_text_icon(font, request.label, request.size, &style), false)
            }
        };
        ThemeImage { image, overlay: None, valid, procedural: false, size: request.size }
    }

    pub fn image(&self) -> &Surface {
        &self.image
    }

    pub fn overlay(&self) -> Option<&Surface> {
        self.overlay.as_ref()
    }

    /// Whether the image came from a file.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether the background was drawn from colors because no image loaded.
    pub fn is_procedural(&self) -> bool {
        self.procedural
    }

    /// Requested size for tray images, largest dimension otherwise.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Cache key of a tray image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrayKey {
    pub icon: String,
    pub label: String,
}

struct TrayRequest<'a> {
    icon: &'a str,
    label: &'a str,
    size: u32,
    prefer_text: bool,
}

fn load_theme_file(dirs: &DataDirs, theme: &str, relative: &str) -> Option<Surface> {
    if relative.is_empty() {
        return None;
    }
    let Some(path) = dirs.theme_file(theme, relative) else {
        debug!("{relative} not found in theme {theme}");
        return None;
    };
    Surface::load(&path)
        .map_err(|e| warn!("Failed to load {}: {e}", path.display()))
        .ok()
}

pub struct Theme {
    name: String,
    config: ThemeConfig,
    mask_config: BackgroundImageConfig,
    data_dirs: DataDirs,
    icon_theme: Box<dyn IconLookup>,
    tray: TrayConfig,
    tray_font: Option<fontdue::Font>,
    backgrounds: ImageCache<BackgroundImageConfig, ThemeImage>,
    actions: ImageCache<ActionImageConfig, ThemeImage>,
    tray_images: ImageCache<TrayKey, ThemeImage>,
}

impl Theme {
    /// Unloaded theme with built-in defaults. Call [`Theme::load`] to read
    /// a theme from the data dirs.
    pub fn new(data_dirs: DataDirs, icon_theme: Box<dyn IconLookup>, tray: TrayConfig) -> Self {
        let tray_font = text_icon::load_font(&tray.font);
        let config = ThemeConfig::default();
        Theme {
            name: String::new(),
            mask_config: derive_mask_config(&config),
            config,
            data_dirs,
            icon_theme,
            tray,
            tray_font,
            backgrounds: ImageCache::new(),
            actions: ImageCache::new(),
            tray_images: ImageCache::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ThemeConfig {
        &self.config
    }

    /// Input panel background with the overlay dropped and the image
    /// replaced by the blur mask.
    pub fn mask_config(&self) -> &BackgroundImageConfig {
        &self.mask_config
    }

    pub fn data_dirs(&self) -> &DataDirs {
        &self.data_dirs
    }

    pub fn icon_theme_name(&self) -> &str {
        self.icon_theme.internal_name()
    }

    /// Load `themes/<name>/theme.conf`: the system copy, then the user copy
    /// over it. On a parse error the current theme is left as it was.
    pub fn load(&mut self, name: &str) -> Result<()> {
        let relative = theme_relative(name, THEME_CONF);
        let system = self.data_dirs.locate_system(&relative);
        let user = self.data_dirs.locate_user(&relative);
        let config = ThemeConfig::load_layered(system.as_deref(), user.as_deref())?;
        info!("Loaded theme {name}");
        self.load_with_config(name, config);
        Ok(())
    }

    /// Use an already parsed configuration for theme `name`.
    pub fn load_with_config(&mut self, name: &str, config: ThemeConfig) {
        self.reset();
        self.name = name.to_string();
        self.mask_config = derive_mask_config(&config);
        self.config = config;
    }

    /// Drop every cached image.
    pub fn reset(&mut self) {
        self.tray_images.clear();
        self.backgrounds.clear();
        self.actions.clear();
    }

    /// Switch icon themes. Only tray images depend on it, so only those are
    /// dropped. Returns false when `name` is already active.
    pub fn set_icon_theme(&mut self, name: &str) -> bool {
        if self.icon_theme.internal_name() == name {
            return false;
        }
        debug!("New icon theme: {name}");
        self.icon_theme.switch_theme(name);
        self.tray_images.clear();
        true
    }

    pub fn load_background(&mut self, cfg: &BackgroundImageConfig) -> &ThemeImage {
        self.backgrounds
            .get_or_insert_with(cfg, || ThemeImage::background(&self.data_dirs, &self.name, cfg))
    }

    pub fn load_action(&mut self, cfg: &ActionImageConfig) -> &ThemeImage {
        self.actions
            .get_or_insert_with(cfg, || ThemeImage::action(&self.data_dirs, &self.name, cfg))
    }

    /// Tray image for `icon` with `label` as text fallback, `size` pixels
    /// square. Text wins when the label is non-empty and either the caller
    /// or the tray config prefers it. Asking again with another size
    /// replaces the cached image.
    pub fn load_image(&mut self, icon: &str, label: &str, size: u32, prefer_text: bool) -> &ThemeImage {
        let key = TrayKey { icon: icon.to_string(), label: label.to_string() };
        if self.tray_images.get(&key).is_some_and(|image| image.size != size) {
            self.tray_images.remove(&key);
        }
        let request = TrayRequest {
            icon,
            label,
            size,
            prefer_text: !label.is_empty() && (prefer_text || self.tray.prefer_text_icon),
        };
        self.tray_images.get_or_insert_with(&key, || {
            ThemeImage::tray(self.icon_theme.as_ref(), self.tray_font.as_ref(), &self.tray, &request)
        })
    }

    /// Paint the background for `cfg` stretched to `width` x `height`.
    pub fn paint_background(
        &mut self,
        canvas: &mut Canvas,
        cfg: &BackgroundImageConfig,
        width: i32,
        height: i32,
        alpha: f32,
    ) {
        let image = self.load_background(cfg);
        nine_patch::paint_background(canvas, &image.image, image.overlay.as_ref(), cfg, width, height, alpha);
    }

    pub fn paint_action(&mut self, canvas: &mut Canvas, cfg: &ActionImageConfig, alpha: f32) {
        let image = self.load_action(cfg);
        nine_patch::paint_action(canvas, &image.image, alpha);
    }

    /// Window shape of the background for `cfg` at `width` x `height`.
    pub fn mask(&mut self, cfg: &BackgroundImageConfig, width: i32, height: i32) -> Vec<Rect> {
        if width <= 0 || height <= 0 {
            return Vec::new();
        }
        let image = self.load_background(cfg);
        mask::shape_rects(width as u32, height as u32, BitOrder::native(), |canvas| {
            nine_patch::paint_background(canvas, &image.image, image.overlay.as_ref(), cfg, width, height, 1.0)
        })
    }

    /// Shape of the input panel blur area.
    pub fn blur_mask(&mut self, width: i32, height: i32) -> Vec<Rect> {
        let cfg = self.mask_config.clone();
        self.mask(&cfg, width, height)
    }

    /// Paths of every `theme.conf` candidate for the current theme, existing
    /// or not.
    pub fn config_paths(&self) -> Vec<PathBuf> {
        let relative = theme_relative(&self.name, THEME_CONF);
        self.data_dirs
            .user
            .iter()
            .chain(&self.data_dirs.system)
            .map(|d| d.join(&relative))
            .collect()
    }

    #[cfg(test)]
    fn cache_builds(&self) -> (usize, usize, usize) {
        (self.backgrounds.builds(), self.actions.builds(), self.tray_images.builds())
    }
}

fn derive_mask_config(config: &ThemeConfig) -> BackgroundImageConfig {
    BackgroundImageConfig {
        image: config.input_panel.blur_mask.clone(),
        overlay: String::new(),
        ..config.input_panel.background.clone()
    }
}
