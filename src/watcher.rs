//! Theme directory watcher.
//! Reports edits to `theme.conf` and theme images so the panel can reload.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::time::Duration;

use log::{debug, info};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use panel_theme::theme::THEME_CONF;

/// Quiet period collapsing bursts of writes into one reload.
const DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeChanged {
    pub paths: Vec<PathBuf>,
}

/// Watch every directory in `dirs` and report theme asset changes through
/// `tx`. Blocks the calling thread until the receiver goes away.
pub fn watch_theme(dirs: &[PathBuf], tx: Sender<ThemeChanged>) -> Result<(), String> {
    let (notify_tx, notify_rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        if let Ok(event) = res {
            let _ = notify_tx.send(event);
        }
    })
    .map_err(|e| format!("watcher: {e}"))?;

    for dir in dirs {
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|e| format!("watch {}: {e}", dir.display()))?;
        info!("Watching theme dir {}", dir.display());
    }

    loop {
        let Ok(event) = notify_rx.recv() else {
            return Err("watcher disconnected".to_string());
        };
        let mut paths = relevant_paths(&event);
        // Let the editor finish writing before asking for a reload.
        while let Ok(event) = notify_rx.recv_timeout(DEBOUNCE) {
            for path in relevant_paths(&event) {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        if paths.is_empty() {
            continue;
        }
        debug!("theme change: {paths:?}");
        if tx.send(ThemeChanged { paths }).is_err() {
            return Ok(());
        }
    }
}

fn relevant_paths(event: &Event) -> Vec<PathBuf> {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)) {
        return Vec::new();
    }
    event.paths.iter().filter(|p| is_theme_asset(p)).cloned().collect()
}

/// Whether `path` is a `theme.conf` or an image a theme could reference.
pub fn is_theme_asset(path: &Path) -> bool {
    if path.file_name().is_some_and(|n| n == THEME_CONF) {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png") || e.eq_ignore_ascii_case("svg"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    #[test]
    fn asset_filter() {
        assert!(is_theme_asset(Path::new("/t/dark/theme.conf")));
        assert!(is_theme_asset(Path::new("/t/dark/panel.PNG")));
        assert!(is_theme_asset(Path::new("/t/dark/arrow.svg")));
        assert!(!is_theme_asset(Path::new("/t/dark/theme.conf.swp")));
        assert!(!is_theme_asset(Path::new("/t/dark/README")));
    }

    #[test]
    fn only_changes_to_assets_count() {
        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/t/dark/theme.conf"))
            .add_path(PathBuf::from("/t/dark/notes.txt"));
        assert_eq!(relevant_paths(&event), vec![PathBuf::from("/t/dark/theme.conf")]);

        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("/t/dark/a.png"));
        assert_eq!(relevant_paths(&created).len(), 1);

        let read = Event::new(EventKind::Access(AccessKind::Any)).add_path(PathBuf::from("/t/dark/theme.conf"));
        assert!(relevant_paths(&read).is_empty());
    }
}
