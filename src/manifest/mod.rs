//! The ordered list of files a sync pushes into the container.
//!
//! Every source (bundled assets, generated files, host files, glob matches)
//! produces the same [`SyncItem`] shape. Items are pushed in order, so when two
//! items share a destination the later one wins; there is no separate dedup.

pub mod assets;
pub mod env_file;
pub mod home;
pub mod rules;

use thiserror::Error;

use crate::config::SandboxConfig;
use crate::layout::SandboxLayout;

pub use assets::{AssetProvider, BuiltinAssets, BundledAssets};
pub use env_file::EnvFile;
pub use home::HomeOverlay;
pub use rules::SyncRules;

/// One file to place in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncItem {
    pub data: Vec<u8>,
    pub dest: String,
    pub mode: String,
    pub owner: String,
}

impl SyncItem {
    pub fn new(
        data: impl Into<Vec<u8>>,
        dest: impl Into<String>,
        mode: &str,
        owner: &str,
    ) -> Self {
        Self {
            data: data.into(),
            dest: dest.into(),
            mode: mode.to_string(),
            owner: owner.to_string(),
        }
    }

    /// Parent directory inside the container.
    pub fn parent_dir(&self) -> &str {
        match self.dest.rfind('/') {
            Some(0) => "/",
            Some(idx) => &self.dest[..idx],
            None => ".",
        }
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Bundled asset missing: {0}")]
    MissingAsset(String),
}

pub type Result<T> = std::result::Result<T, ManifestError>;

/// Something that contributes items to the manifest.
///
/// Per-item problems (unreadable files, bad globs) are logged and skipped by
/// the source itself; only errors that make the whole manifest unusable are
/// returned.
pub trait ItemSource {
    fn items(&self) -> Result<Vec<SyncItem>>;
}

/// Build the full manifest in precedence order: bundled assets, env file,
/// home overlay, then explicit sync rules.
pub fn build(
    config: &SandboxConfig,
    assets: &dyn AssetProvider,
    layout: &SandboxLayout,
) -> Result<Vec<SyncItem>> {
    let host_env = |name: &str| std::env::var(name).ok();

    let builtins = BuiltinAssets::new(assets, layout);
    let env_file = EnvFile::new(&config.env, &layout.env_file, &host_env);
    let overlay = HomeOverlay::new(&layout.home_overlay, &layout.container_home);
    let rules = SyncRules::new(&config.sync, layout);
    let sources: [&dyn ItemSource; 4] = [&builtins, &env_file, &overlay, &rules];

    let mut items = Vec::new();
    for source in sources {
        items.extend(source.items()?);
    }
    Ok(items)
}
