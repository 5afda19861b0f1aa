//! Mirror of `~/.sandbox/home/` into the container home directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{ItemSource, Result, SyncItem};
use crate::layout::AGENT_OWNER;

pub struct HomeOverlay<'a> {
    root: &'a Path,
    container_home: &'a str,
}

impl<'a> HomeOverlay<'a> {
    pub fn new(root: &'a Path, container_home: &'a str) -> Self {
        Self {
            root,
            container_home,
        }
    }
}

/// Regular files under `dir`, depth-first in name order.
///
/// Symlinked files are read through the link; symlinked directories are not entered.
fn walk_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot read directory {}: {}", dir.display(), e);
            return;
        }
    };

    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();

    for path in paths {
        let is_link = match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => {
                walk_files(&path, out);
                continue;
            }
            Ok(meta) => meta.file_type().is_symlink(),
            Err(e) => {
                warn!("cannot stat {}: {}", path.display(), e);
                continue;
            }
        };

        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => out.push(path),
            Ok(meta) if meta.is_dir() && is_link => {
                debug!("not following directory link {}", path.display());
            }
            Ok(_) => {}
            Err(e) => warn!("cannot stat {}: {}", path.display(), e),
        }
    }
}

impl ItemSource for HomeOverlay<'_> {
    fn items(&self) -> Result<Vec<SyncItem>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        walk_files(self.root, &mut files);

        let mut items = Vec::with_capacity(files.len());
        for path in files {
            let Ok(rel) = path.strip_prefix(self.root) else {
                continue;
            };
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let data = match fs::read(&path) {
                Ok(data) => data,
                Err(e) => {
                    warn!("cannot read {}: {}", path.display(), e);
                    continue;
                }
            };

            let mode = if rel.starts_with("bin/") { "0755" } else { "0644" };
            items.push(SyncItem::new(
                data,
                format!("{}/{}", self.container_home, rel),
                mode,
                AGENT_OWNER,
            ));
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_overlay_is_empty() {
        let overlay = HomeOverlay::new(Path::new("/nonexistent/overlay"), "/home/agent");
        assert!(overlay.items().unwrap().is_empty());
    }

    #[test]
    fn test_overlay_preserves_structure_and_modes() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::create_dir_all(root.join(".config/gh")).unwrap();
        fs::write(root.join(".zshrc"), "zsh").unwrap();
        fs::write(root.join(".config/gh/hosts.yml"), "gh").unwrap();
        fs::write(root.join("bin/helper"), "bin").unwrap();

        let items = HomeOverlay::new(root, "/home/agent").items().unwrap();
        let summary: Vec<(&str, &str)> = items
            .iter()
            .map(|i| (i.dest.as_str(), i.mode.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("/home/agent/.config/gh/hosts.yml", "0644"),
                ("/home/agent/.zshrc", "0644"),
                ("/home/agent/bin/helper", "0755"),
            ]
        );
        assert!(items.iter().all(|i| i.owner == "agent:agent"));
    }

    #[test]
    fn test_bin_prefix_must_be_a_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::write(temp.path().join("binary-notes.txt"), "x").unwrap();
        let items = HomeOverlay::new(temp.path(), "/home/agent").items().unwrap();
        assert_eq!(items[0].mode, "0644");
    }

    #[test]
    fn test_directory_links_are_not_followed() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join(".zshrc"), "zsh").unwrap();
        std::os::unix::fs::symlink(".", root.join("loop")).unwrap();

        let items = HomeOverlay::new(root, "/home/agent").items().unwrap();
        let dests: Vec<&str> = items.iter().map(|i| i.dest.as_str()).collect();
        assert_eq!(dests, vec!["/home/agent/.zshrc"]);
    }

    #[test]
    fn test_file_links_are_read_through() {
        let temp = tempfile::TempDir::new().unwrap();
        let target = temp.path().join("gitconfig");
        fs::write(&target, "[user]").unwrap();
        let root = temp.path().join("overlay");
        fs::create_dir_all(&root).unwrap();
        std::os::unix::fs::symlink(&target, root.join(".gitconfig")).unwrap();

        let items = HomeOverlay::new(&root, "/home/agent").items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].dest, "/home/agent/.gitconfig");
        assert_eq!(items[0].data, b"[user]");
    }
}
