//! Fixed names and paths for one sandbox, on the host and inside the container.
//!
//! A `SandboxLayout` is built once at startup and passed to every component
//! instead of being read from globals, so tests can point it at scratch
//! directories.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const CONTAINER_NAME_PREFIX: &str = "sandbox-";
pub const CONFIG_DIR_NAME: &str = ".sandbox";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Identity used for files and commands that belong to the agent.
pub const AGENT_OWNER: &str = "agent:agent";
/// Identity used for files that only root may touch.
pub const ROOT_OWNER: &str = "root:root";

#[derive(Debug, Clone)]
pub struct SandboxLayout {
    /// The host user's home directory (target of `~/` in sync sources).
    pub host_home: PathBuf,
    /// Global config document.
    pub global_config: PathBuf,
    /// Directory mirrored into the container home.
    pub home_overlay: PathBuf,

    /// The agent's home directory inside the container (target of `~/` in destinations).
    pub container_home: String,
    pub env_file: String,
    pub fingerprint_file: String,
    pub firewall_rules_v4: String,
    pub firewall_rules_v6: String,
    pub entrypoint_script: String,
    pub firewall_script: String,
}

impl SandboxLayout {
    /// Layout rooted at the current user's home directory.
    pub fn from_env() -> Result<Self> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(Self::with_host_home(home))
    }

    pub fn with_host_home(host_home: impl Into<PathBuf>) -> Self {
        let host_home = host_home.into();
        let config_root = host_home.join(CONFIG_DIR_NAME);
        Self {
            global_config: config_root.join(CONFIG_FILE_NAME),
            home_overlay: config_root.join("home"),
            host_home,
            container_home: "/home/agent".to_string(),
            env_file: "/home/agent/.sandbox-env".to_string(),
            fingerprint_file: "/opt/sandbox-sync.sha256".to_string(),
            firewall_rules_v4: "/opt/sandbox-firewall-rules.sh".to_string(),
            firewall_rules_v6: "/opt/sandbox-firewall-rules6.sh".to_string(),
            entrypoint_script: "/opt/entrypoint.sh".to_string(),
            firewall_script: "/opt/init-firewall.sh".to_string(),
        }
    }

    /// Workspace-scoped config document.
    pub fn workspace_config(&self, workspace: &Path) -> PathBuf {
        workspace.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// Expand a leading `~/` against the host home directory.
    pub fn expand_host_tilde(&self, path: &str) -> PathBuf {
        match path.strip_prefix("~/") {
            Some(rest) => self.host_home.join(rest),
            None => PathBuf::from(path),
        }
    }

    /// Expand a leading `~/` against the container home directory.
    pub fn expand_container_tilde(&self, path: &str) -> String {
        match path.strip_prefix("~/") {
            Some(rest) => format!("{}/{}", self.container_home, rest),
            None => path.to_string(),
        }
    }
}

/// Container name for a workspace: `sandbox-<basename>`.
///
/// Two workspaces with the same basename share a name.
pub fn container_name(workspace: &Path) -> String {
    let base = workspace
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| workspace.to_string_lossy().into_owned());
    format!("{}{}", CONTAINER_NAME_PREFIX, base)
}
