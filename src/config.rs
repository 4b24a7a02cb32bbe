//! TOML theme configuration.
//!
//! A theme lives at `themes/<name>/theme.conf`. The system copy is read first,
//! then a user copy (if any) is merged over it key by key.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Deserializer};

use crate::error::{Result, ThemeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Color::from_hex(&value).ok_or_else(|| format!("invalid color {value:?}"))
    }
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            6 => Some(Color { r: channel(0)?, g: channel(2)?, b: channel(4)?, a: 255 }),
            8 => Some(Color { r: channel(0)?, g: channel(2)?, b: channel(4)?, a: channel(6)? }),
            _ => None,
        }
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

/// Fixed borders of a nine-patch image, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct Margin {
    #[serde(deserialize_with = "non_negative")]
    pub top: i32,
    #[serde(deserialize_with = "non_negative")]
    pub bottom: i32,
    #[serde(deserialize_with = "non_negative")]
    pub left: i32,
    #[serde(deserialize_with = "non_negative")]
    pub right: i32,
}

fn non_negative<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i32, D::Error> {
    let value = i32::deserialize(deserializer)?;
    if value < 0 {
        return Err(serde::de::Error::custom(format!("expected a non-negative size, got {value}")));
    }
    Ok(value)
}

impl Margin {
    pub const fn uniform(v: i32) -> Self {
        Margin { top: v, bottom: v, left: v, right: v }
    }
}

/// Where an overlay is anchored on its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gravity {
    #[default]
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

/// Placement along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Near,
    Middle,
    Far,
}

impl Anchor {
    /// Start coordinate of an item of `size` on an axis of `extent`.
    /// The offset pushes inward from whichever edge the item hugs.
    pub fn place(self, extent: i32, size: i32, offset: i32) -> i32 {
        match self {
            Anchor::Near => offset,
            Anchor::Middle => (extent - size) / 2 + offset,
            Anchor::Far => extent - size - offset,
        }
    }
}

impl Gravity {
    pub fn horizontal(self) -> Anchor {
        match self {
            Gravity::TopLeft | Gravity::CenterLeft | Gravity::BottomLeft => Anchor::Near,
            Gravity::TopCenter | Gravity::Center | Gravity::BottomCenter => Anchor::Middle,
            Gravity::TopRight | Gravity::CenterRight | Gravity::BottomRight => Anchor::Far,
        }
    }

    pub fn vertical(self) -> Anchor {
        match self {
            Gravity::TopLeft | Gravity::TopCenter | Gravity::TopRight => Anchor::Near,
            Gravity::CenterLeft | Gravity::Center | Gravity::CenterRight => Anchor::Middle,
            Gravity::BottomLeft | Gravity::BottomCenter | Gravity::BottomRight => Anchor::Far,
        }
    }
}

/// A stretchable background plus an optional overlay badge.
///
/// Paths are relative to the theme directory. An empty `image` means the
/// background is drawn procedurally from `color`, `border_color` and
/// `border_width`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct BackgroundImageConfig {
    pub image: String,
    pub color: Color,
    pub border_color: Color,
    #[serde(deserialize_with = "non_negative")]
    pub border_width: i32,
    pub overlay: String,
    pub gravity: Gravity,
    pub overlay_offset_x: i32,
    pub overlay_offset_y: i32,
    pub hide_overlay_if_oversize: bool,
    pub margin: Margin,
    pub overlay_clip_margin: Margin,
}

impl Default for BackgroundImageConfig {
    fn default() -> Self {
        BackgroundImageConfig {
            image: String::new(),
            color: Color::rgba(0xff, 0xff, 0xff, 0xff),
            border_color: Color::rgba(0xff, 0xff, 0xff, 0x00),
            border_width: 0,
            overlay: String::new(),
            gravity: Gravity::TopLeft,
            overlay_offset_x: 0,
            overlay_offset_y: 0,
            hide_overlay_if_oversize: false,
            margin: Margin::uniform(2),
            overlay_clip_margin: Margin::default(),
        }
    }
}

/// An un-stretched image such as a page arrow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct ActionImageConfig {
    pub image: String,
    pub click_margin: Margin,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ThemeMetadata {
    pub name: String,
    pub version: u32,
    pub author: String,
    pub description: String,
    pub scale_with_dpi: bool,
}

impl Default for ThemeMetadata {
    fn default() -> Self {
        ThemeMetadata {
            name: String::new(),
            version: 1,
            author: String::new(),
            description: String::new(),
            scale_with_dpi: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InputPanelConfig {
    pub font: String,
    pub normal_color: Color,
    pub highlight_candidate_color: Color,
    pub highlight_color: Color,
    pub highlight_background_color: Color,
    pub background: BackgroundImageConfig,
    pub highlight: BackgroundImageConfig,
    pub content_margin: Margin,
    pub text_margin: Margin,
    pub prev_page: ActionImageConfig,
    pub next_page: ActionImageConfig,
    /// Image whose opaque pixels define the blurred area behind the panel.
    pub blur_mask: String,
    pub blur_margin: Margin,
    pub enable_blur: bool,
    pub spacing: i32,
}

impl Default for InputPanelConfig {
    fn default() -> Self {
        InputPanelConfig {
            font: "Sans 10".into(),
            normal_color: Color::rgba(0, 0, 0, 0xff),
            highlight_candidate_color: Color::rgba(0xff, 0xff, 0xff, 0xff),
            highlight_color: Color::rgba(0xff, 0xff, 0xff, 0xff),
            highlight_background_color: Color::rgba(0xa5, 0xa5, 0xa5, 0xff),
            background: BackgroundImageConfig::default(),
            highlight: BackgroundImageConfig {
                color: Color::rgba(0xa5, 0xa5, 0xa5, 0xff),
                ..BackgroundImageConfig::default()
            },
            content_margin: Margin::uniform(2),
            text_margin: Margin::uniform(5),
            prev_page: ActionImageConfig::default(),
            next_page: ActionImageConfig::default(),
            blur_mask: String::new(),
            blur_margin: Margin::default(),
            enable_blur: false,
            spacing: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MenuThemeConfig {
    pub font: String,
    pub normal_color: Color,
    pub highlighted_item_color: Color,
    pub background: BackgroundImageConfig,
    pub highlight: BackgroundImageConfig,
    pub separator: BackgroundImageConfig,
    pub checkbox: ActionImageConfig,
    pub sub_menu: ActionImageConfig,
    pub content_margin: Margin,
    pub text_margin: Margin,
}

impl Default for MenuThemeConfig {
    fn default() -> Self {
        MenuThemeConfig {
            font: "Sans 10".into(),
            normal_color: Color::rgba(0, 0, 0, 0xff),
            highlighted_item_color: Color::rgba(0xff, 0xff, 0xff, 0xff),
            background: BackgroundImageConfig::default(),
            highlight: BackgroundImageConfig {
                color: Color::rgba(0xa5, 0xa5, 0xa5, 0xff),
                ..BackgroundImageConfig::default()
            },
            separator: BackgroundImageConfig {
                color: Color::rgba(0xbb, 0xbb, 0xbb, 0xff),
                margin: Margin::default(),
                ..BackgroundImageConfig::default()
            },
            checkbox: ActionImageConfig::default(),
            sub_menu: ActionImageConfig::default(),
            content_margin: Margin::uniform(2),
            text_margin: Margin::uniform(5),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub metadata: ThemeMetadata,
    pub input_panel: InputPanelConfig,
    pub menu: MenuThemeConfig,
}

impl ThemeConfig {
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Read the system file, then merge the user file over it. Either may be
    /// absent; with neither, the built-in defaults come back.
    pub fn load_layered(system: Option<&Path>, user: Option<&Path>) -> Result<Self> {
        let mut merged = toml::Table::new();
        let mut last: Option<PathBuf> = None;
        for path in [system, user].into_iter().flatten() {
            let content = std::fs::read_to_string(path)?;
            let table: toml::Table = toml::from_str(&content).map_err(|source| ThemeError::Config {
                path: path.to_path_buf(),
                source,
            })?;
            debug!("merging theme config {}", path.display());
            merge_tables(&mut merged, table);
            last = Some(path.to_path_buf());
        }

        if last.is_none() {
            info!("no theme.conf found, using built-in defaults");
        }

        toml::Value::Table(merged).try_into().map_err(|source| ThemeError::Config {
            path: last.unwrap_or_else(|| PathBuf::from("theme.conf")),
            source,
        })
    }
}

/// Recursively merge `overlay` into `base`; overlay values win, tables merge.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(overlay_table) => {
                if let Some(toml::Value::Table(base_table)) = base.get_mut(&key) {
                    merge_tables(base_table, overlay_table);
                } else {
                    base.insert(key, toml::Value::Table(overlay_table));
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

/// Appearance of tray text icons. Owned by the panel UI, not the theme.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrayConfig {
    /// Font file used for text icons.
    pub font: PathBuf,
    pub text_color: Color,
    pub outline_color: Color,
    pub prefer_text_icon: bool,
}

impl Default for TrayConfig {
    fn default() -> Self {
        TrayConfig {
            font: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"),
            text_color: Color::rgba(0xff, 0xff, 0xff, 0xff),
            outline_color: Color::rgba(0, 0, 0, 0xff),
            prefer_text_icon: false,
        }
    }
}
