//! CLI command implementations

pub mod config;
pub mod definition;
pub mod firewall;
pub mod sync;

pub use definition::{Cli, Commands};

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// Absolute path of a workspace directory argument.
pub fn resolve_workspace(path: &Path) -> Result<PathBuf> {
    let path = if path.as_os_str() == "." {
        std::env::current_dir()?
    } else {
        path.canonicalize()?
    };

    if !path.is_dir() {
        bail!("Path is not a directory: {}", path.display());
    }
    Ok(path)
}
