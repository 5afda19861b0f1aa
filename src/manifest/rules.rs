//! Explicit `sync:` rules from the config, with tilde and glob expansion.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::{ItemSource, Result, SyncItem};
use crate::config::SyncRule;
use crate::layout::SandboxLayout;

pub struct SyncRules<'a> {
    rules: &'a [SyncRule],
    layout: &'a SandboxLayout,
}

impl<'a> SyncRules<'a> {
    pub fn new(rules: &'a [SyncRule], layout: &'a SandboxLayout) -> Self {
        Self { rules, layout }
    }
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Host paths a source refers to. A pattern with no matches comes back as
/// itself so the failed read is reported instead of silently vanishing.
/// `None` when the pattern itself is invalid.
fn expand_source(src: &Path, written: &str) -> Option<Vec<PathBuf>> {
    let pattern = src.to_string_lossy();
    if !has_glob_meta(&pattern) {
        return Some(vec![src.to_path_buf()]);
    }

    let paths = match glob::glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("invalid glob {:?}: {}", written, e);
            return None;
        }
    };

    let matches: Vec<PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("glob {:?}: {}", written, e);
                None
            }
        })
        .collect();

    if matches.is_empty() {
        Some(vec![src.to_path_buf()])
    } else {
        Some(matches)
    }
}

fn join_dest(dir: &str, path: &Path) -> String {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/{}", dir.trim_end_matches('/'), base)
}

impl ItemSource for SyncRules<'_> {
    fn items(&self) -> Result<Vec<SyncItem>> {
        let mut items = Vec::new();

        for rule in self.rules {
            let src = self.layout.expand_host_tilde(&rule.src);
            let dest = self.layout.expand_container_tilde(&rule.dest);

            let Some(matches) = expand_source(&src, &rule.src) else {
                continue;
            };

            // A trailing slash, or more than one match, means dest is a directory
            let into_dir = dest.ends_with('/') || matches.len() > 1;

            for path in &matches {
                let data = match fs::read(path) {
                    Ok(data) => data,
                    Err(e) => {
                        warn!("cannot read {}: {}", path.display(), e);
                        continue;
                    }
                };
                let target = if into_dir {
                    join_dest(&dest, path)
                } else {
                    dest.clone()
                };
                items.push(SyncItem::new(data, target, rule.mode(), rule.owner()));
            }
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(src: &str, dest: &str) -> SyncRule {
        SyncRule {
            src: src.to_string(),
            dest: dest.to_string(),
            mode: None,
            owner: None,
        }
    }

    fn setup() -> (tempfile::TempDir, SandboxLayout) {
        let temp = tempfile::TempDir::new().unwrap();
        let layout = SandboxLayout::with_host_home(temp.path());
        (temp, layout)
    }

    #[test]
    fn test_literal_source_with_tilde() {
        let (temp, layout) = setup();
        fs::write(temp.path().join(".gitconfig"), "[user]").unwrap();
        let rules = vec![rule("~/.gitconfig", "~/.gitconfig")];

        let items = SyncRules::new(&rules, &layout).items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].dest, "/home/agent/.gitconfig");
        assert_eq!(items[0].mode, "0644");
        assert_eq!(items[0].owner, "agent:agent");
        assert_eq!(items[0].data, b"[user]");
    }

    #[test]
    fn test_mode_and_owner_from_rule() {
        let (temp, layout) = setup();
        fs::write(temp.path().join("tool.conf"), "x").unwrap();
        let rules = vec![SyncRule {
            mode: Some("0600".into()),
            owner: Some("root:root".into()),
            ..rule("~/tool.conf", "/etc/tool.conf")
        }];

        let items = SyncRules::new(&rules, &layout).items().unwrap();
        assert_eq!(items[0].mode, "0600");
        assert_eq!(items[0].owner, "root:root");
    }

    #[test]
    fn test_unreadable_source_is_skipped() {
        let (temp, layout) = setup();
        fs::write(temp.path().join("ok"), "ok").unwrap();
        let rules = vec![rule("~/missing", "/opt/missing"), rule("~/ok", "/opt/ok")];

        let items = SyncRules::new(&rules, &layout).items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].dest, "/opt/ok");
    }

    #[test]
    fn test_glob_without_matches_is_skipped() {
        let (_temp, layout) = setup();
        let rules = vec![rule("~/themes/*.zsh-theme", "~/themes/")];
        let items = SyncRules::new(&rules, &layout).items().unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_multiple_matches_go_under_dest() {
        let (temp, layout) = setup();
        let themes = temp.path().join("themes");
        fs::create_dir_all(&themes).unwrap();
        fs::write(themes.join("a.zsh-theme"), "a").unwrap();
        fs::write(themes.join("b.zsh-theme"), "b").unwrap();
        fs::write(themes.join("ignored.txt"), "c").unwrap();
        let rules = vec![rule("~/themes/*.zsh-theme", "~/.oh-my-zsh/themes")];

        let items = SyncRules::new(&rules, &layout).items().unwrap();
        let dests: Vec<&str> = items.iter().map(|i| i.dest.as_str()).collect();
        assert_eq!(
            dests,
            vec![
                "/home/agent/.oh-my-zsh/themes/a.zsh-theme",
                "/home/agent/.oh-my-zsh/themes/b.zsh-theme",
            ]
        );
    }

    #[test]
    fn test_single_match_maps_to_dest() {
        let (temp, layout) = setup();
        fs::write(temp.path().join("only.cfg"), "x").unwrap();
        let rules = vec![rule("~/only.*", "/opt/app.cfg")];

        let items = SyncRules::new(&rules, &layout).items().unwrap();
        assert_eq!(items[0].dest, "/opt/app.cfg");
    }

    #[test]
    fn test_single_match_with_trailing_slash_goes_under_dest() {
        let (temp, layout) = setup();
        fs::write(temp.path().join("only.zsh-theme"), "x").unwrap();
        let rules = vec![rule("~/*.zsh-theme", "~/.oh-my-zsh/custom/themes/")];

        let items = SyncRules::new(&rules, &layout).items().unwrap();
        assert_eq!(
            items[0].dest,
            "/home/agent/.oh-my-zsh/custom/themes/only.zsh-theme"
        );
    }

    #[test]
    fn test_invalid_glob_is_skipped() {
        let (_temp, layout) = setup();
        let rules = vec![rule("~/[unclosed", "/opt/x")];
        let items = SyncRules::new(&rules, &layout).items().unwrap();
        assert!(items.is_empty());
    }
}
