use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "No sandbox config found (looked for {} and {}).\n\
         Run 'sandbox config init' to create one.",
        global.display(),
        workspace.display()
    )]
    NotFound { global: PathBuf, workspace: PathBuf },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
