//! Where theme files and icons live on disk.

use std::env;
use std::path::{Path, PathBuf};

use log::debug;

const APP_DIR: &str = "panel-theme";
const ICON_EXTENSIONS: &[&str] = &["png", "svg"];
const FALLBACK_ICON_THEME: &str = "hicolor";

/// Package data directories, searched user first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataDirs {
    pub user: Option<PathBuf>,
    pub system: Vec<PathBuf>,
}

impl DataDirs {
    pub fn new(user: Option<PathBuf>, system: Vec<PathBuf>) -> Self {
        DataDirs { user, system }
    }

    /// Resolve directories from the environment:
    /// 1. `$PANEL_THEME_DATA_HOME`, else `$XDG_DATA_HOME/panel-theme`,
    ///    else `~/.local/share/panel-theme`
    /// 2. `$PANEL_THEME_DATA_DIRS`, else each `$XDG_DATA_DIRS` entry joined
    ///    with `panel-theme`, else `/usr/local/share` and `/usr/share`
    pub fn from_env() -> Self {
        let user = env::var_os("PANEL_THEME_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("XDG_DATA_HOME").map(|d| PathBuf::from(d).join(APP_DIR)))
            .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share").join(APP_DIR)));

        let system = match env::var_os("PANEL_THEME_DATA_DIRS") {
            Some(dirs) => env::split_paths(&dirs).collect(),
            None => {
                let xdg = env::var_os("XDG_DATA_DIRS")
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| "/usr/local/share:/usr/share".into());
                env::split_paths(&xdg).map(|d| d.join(APP_DIR)).collect()
            }
        };

        debug!("data dirs: user {user:?}, system {system:?}");
        DataDirs { user, system }
    }

    pub fn locate_user(&self, relative: &Path) -> Option<PathBuf> {
        self.user.as_ref().map(|d| d.join(relative)).filter(|p| p.is_file())
    }

    /// First system directory holding `relative`.
    pub fn locate_system(&self, relative: &Path) -> Option<PathBuf> {
        self.system.iter().map(|d| d.join(relative)).find(|p| p.is_file())
    }

    pub fn locate(&self, relative: &Path) -> Option<PathBuf> {
        self.locate_user(relative).or_else(|| self.locate_system(relative))
    }

    /// `themes/<name>/<relative>`, user directory first.
    pub fn theme_file(&self, name: &str, relative: &str) -> Option<PathBuf> {
        self.locate(&theme_relative(name, relative))
    }

    /// Every existing `themes/<name>` directory, for file watching.
    pub fn theme_dirs(&self, name: &str) -> Vec<PathBuf> {
        let relative = Path::new("themes").join(name);
        self.user
            .iter()
            .chain(&self.system)
            .map(|d| d.join(&relative))
            .filter(|p| p.is_dir())
            .collect()
    }
}

pub fn theme_relative(name: &str, relative: &str) -> PathBuf {
    Path::new("themes").join(name).join(relative)
}

/// Resolves icon names to files.
pub trait IconLookup {
    fn internal_name(&self) -> &str;

    fn find_icon(&self, name: &str, size: u32, scale: u32) -> Option<PathBuf>;

    /// Look icons up in theme `name` from now on.
    fn switch_theme(&mut self, name: &str);
}

/// Directory-based icon theme in the freedesktop layout:
/// `<base>/<theme>/<size>x<size>[@<scale>]/<context>/<name>.{png,svg}`.
#[derive(Debug, Clone)]
pub struct IconTheme {
    name: String,
    base_dirs: Vec<PathBuf>,
    pixmap_dirs: Vec<PathBuf>,
}

impl IconTheme {
    pub fn new(name: impl Into<String>, base_dirs: Vec<PathBuf>, pixmap_dirs: Vec<PathBuf>) -> Self {
        IconTheme { name: name.into(), base_dirs, pixmap_dirs }
    }

    /// Icon theme using `~/.local/share/icons`, `~/.icons` and the
    /// `icons`/`pixmaps` dirs under each `$XDG_DATA_DIRS` entry.
    pub fn from_env(name: impl Into<String>) -> Self {
        let mut base_dirs = Vec::new();
        if let Some(home) = env::var_os("HOME").map(PathBuf::from) {
            base_dirs.push(home.join(".local/share/icons"));
            base_dirs.push(home.join(".icons"));
        }
        let xdg = env::var_os("XDG_DATA_DIRS")
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "/usr/local/share:/usr/share".into());
        let data_dirs: Vec<PathBuf> = env::split_paths(&xdg).collect();
        base_dirs.extend(data_dirs.iter().map(|d| d.join("icons")));
        let pixmap_dirs = data_dirs.iter().map(|d| d.join("pixmaps")).collect();
        IconTheme::new(name, base_dirs, pixmap_dirs)
    }

    fn find_in_theme(&self, theme: &str, name: &str, size: u32, scale: u32) -> Option<PathBuf> {
        let mut best: Option<(u32, PathBuf)> = None;
        for base in &self.base_dirs {
            let root = base.join(theme);
            let Ok(entries) = std::fs::read_dir(&root) else {
                continue;
            };
            let mut dirs: Vec<_> = entries.flatten().map(|e| e.path()).filter(|p| p.is_dir()).collect();
            dirs.sort();
            for dir in dirs {
                let Some(dir_name) = dir.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let distance = match parse_size_dir(dir_name) {
                    Some((dir_size, dir_scale)) => {
                        let wanted = size * scale;
                        (dir_size * dir_scale).abs_diff(wanted)
                    }
                    // Scalable icons fit any size but lose to an exact raster match.
                    None if dir_name == "scalable" => 1,
                    None => continue,
                };
                if best.as_ref().is_some_and(|(d, _)| *d <= distance) {
                    continue;
                }
                if let Some(path) = find_in_contexts(&dir, name) {
                    if distance == 0 {
                        return Some(path);
                    }
                    best = Some((distance, path));
                }
            }
        }
        best.map(|(_, p)| p)
    }
}

impl IconLookup for IconTheme {
    fn internal_name(&self) -> &str {
        &self.name
    }

    fn find_icon(&self, name: &str, size: u32, scale: u32) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        let path = Path::new(name);
        if path.is_absolute() {
            return path.is_file().then(|| path.to_path_buf());
        }

        let found = self
            .find_in_theme(&self.name, name, size, scale.max(1))
            .or_else(|| {
                (self.name != FALLBACK_ICON_THEME)
                    .then(|| self.find_in_theme(FALLBACK_ICON_THEME, name, size, scale.max(1)))
                    .flatten()
            })
            .or_else(|| self.pixmap_dirs.iter().find_map(|d| find_with_extension(d, name)));
        debug!("icon {name} at {size}px: {found:?}");
        found
    }

    fn switch_theme(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

/// `"24x24"` → `(24, 1)`, `"24x24@2"` → `(24, 2)`.
fn parse_size_dir(name: &str) -> Option<(u32, u32)> {
    let (dims, scale) = match name.split_once('@') {
        Some((dims, scale)) => (dims, scale.trim_end_matches('x').parse().ok()?),
        None => (name, 1),
    };
    let (w, h) = dims.split_once('x')?;
    let w: u32 = w.parse().ok()?;
    (h.parse::<u32>().ok()? == w).then_some((w, scale))
}

fn find_in_contexts(size_dir: &Path, name: &str) -> Option<PathBuf> {
    let mut contexts: Vec<_> = std::fs::read_dir(size_dir).ok()?.flatten().map(|e| e.path()).collect();
    contexts.sort();
    contexts.iter().filter(|p| p.is_dir()).find_map(|d| find_with_extension(d, name))
}

fn find_with_extension(dir: &Path, name: &str) -> Option<PathBuf> {
    ICON_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn user_dir_shadows_system() {
        let tmp = tempfile::tempdir().unwrap();
        let user = tmp.path().join("user");
        let sys_a = tmp.path().join("a");
        let sys_b = tmp.path().join("b");
        touch(&sys_b.join("themes/dark/theme.conf"));
        let dirs = DataDirs::new(Some(user.clone()), vec![sys_a.clone(), sys_b.clone()]);

        assert_eq!(dirs.theme_file("dark", "theme.conf"), Some(sys_b.join("themes/dark/theme.conf")));
        assert_eq!(dirs.locate_user(&theme_relative("dark", "theme.conf")), None);

        touch(&sys_a.join("themes/dark/theme.conf"));
        touch(&user.join("themes/dark/theme.conf"));
        assert_eq!(dirs.theme_file("dark", "theme.conf"), Some(user.join("themes/dark/theme.conf")));
        assert_eq!(
            dirs.locate_system(&theme_relative("dark", "theme.conf")),
            Some(sys_a.join("themes/dark/theme.conf"))
        );
        assert_eq!(dirs.theme_dirs("dark").len(), 3);
        assert!(dirs.theme_file("dark", "missing.png").is_none());
    }

    #[test]
    fn size_dir_names() {
        assert_eq!(parse_size_dir("24x24"), Some((24, 1)));
        assert_eq!(parse_size_dir("24x24@2"), Some((24, 2)));
        assert_eq!(parse_size_dir("24x24@2x"), Some((24, 2)));
        assert_eq!(parse_size_dir("24x32"), None);
        assert_eq!(parse_size_dir("scalable"), None);
    }

    #[test]
    fn exact_size_beats_scalable_and_closer_sizes() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("icons");
        touch(&base.join("breeze/16x16/apps/fcitx.png"));
        touch(&base.join("breeze/22x22/apps/fcitx.png"));
        touch(&base.join("breeze/scalable/apps/fcitx.svg"));
        touch(&base.join("breeze/48x48/status/input-keyboard.png"));
        let theme = IconTheme::new("breeze", vec![base.clone()], vec![]);

        assert_eq!(theme.internal_name(), "breeze");
        assert_eq!(theme.find_icon("fcitx", 22, 1), Some(base.join("breeze/22x22/apps/fcitx.png")));
        assert_eq!(theme.find_icon("fcitx", 32, 1), Some(base.join("breeze/scalable/apps/fcitx.svg")));
        assert_eq!(
            theme.find_icon("input-keyboard", 24, 1),
            Some(base.join("breeze/48x48/status/input-keyboard.png"))
        );
    }

    #[test]
    fn falls_back_to_hicolor_then_pixmaps() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("icons");
        let pixmaps = tmp.path().join("pixmaps");
        touch(&base.join("hicolor/24x24/apps/only-hicolor.png"));
        touch(&pixmaps.join("legacy.png"));
        let theme = IconTheme::new("breeze", vec![base.clone()], vec![pixmaps.clone()]);

        assert_eq!(theme.find_icon("only-hicolor", 24, 1), Some(base.join("hicolor/24x24/apps/only-hicolor.png")));
        assert_eq!(theme.find_icon("legacy", 24, 1), Some(pixmaps.join("legacy.png")));
        assert_eq!(theme.find_icon("nowhere", 24, 1), None);
        assert_eq!(theme.find_icon("", 24, 1), None);
    }

    #[test]
    fn absolute_paths_are_used_directly() {
        let tmp = tempfile::tempdir().unwrap();
        let icon = tmp.path().join("custom.png");
        touch(&icon);
        let theme = IconTheme::new("breeze", vec![], vec![]);
        assert_eq!(theme.find_icon(icon.to_str().unwrap(), 24, 1), Some(icon.clone()));
        assert_eq!(theme.find_icon(tmp.path().join("gone.png").to_str().unwrap(), 24, 1), None);
    }

    #[test]
    fn switching_theme_keeps_search_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("icons");
        touch(&base.join("papirus/24x24/apps/fcitx.png"));
        let mut theme = IconTheme::new("breeze", vec![base.clone()], vec![]);
        assert_eq!(theme.find_icon("fcitx", 24, 1), None);
        theme.switch_theme("papirus");
        assert_eq!(theme.internal_name(), "papirus");
        assert_eq!(theme.find_icon("fcitx", 24, 1), Some(base.join("papirus/24x24/apps/fcitx.png")));
    }
}
