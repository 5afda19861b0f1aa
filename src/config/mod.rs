//! Sandbox configuration: a global document and a workspace document, merged
//! into one effective configuration.
//!
//! Both documents are optional and a broken document only produces a warning,
//! so a typo in one layer never prevents the other from being applied.

pub mod error;
pub mod templates;

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::layout::{SandboxLayout, AGENT_OWNER};
pub use error::{ConfigError, Result};

pub const DEFAULT_MODE: &str = "0644";
pub const DEFAULT_DOMAIN_PORTS: [u16; 2] = [80, 443];

/// Effective configuration. Never mutated after merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SandboxConfig {
    pub sync: Vec<SyncRule>,
    pub env: BTreeMap<String, String>,
    pub firewall: FirewallConfig,
    pub on_sync: Vec<SyncHook>,
}

/// A host file (or glob) to place inside the container. Keyed by `dest` when merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRule {
    pub src: String,
    pub dest: String,

    #[serde(
        default,
        deserialize_with = "deserialize_mode",
        skip_serializing_if = "Option::is_none"
    )]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl SyncRule {
    pub fn mode(&self) -> &str {
        self.mode.as_deref().unwrap_or(DEFAULT_MODE)
    }

    pub fn owner(&self) -> &str {
        self.owner.as_deref().unwrap_or(AGENT_OWNER)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FirewallConfig {
    pub allow: Vec<FirewallEntry>,
}

/// What an allowlist entry points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowTarget {
    Domain(String),
    Cidr(String),
}

/// A validated allowlist entry: exactly one of domain or CIDR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "RawFirewallEntry")]
pub struct FirewallEntry {
    pub target: AllowTarget,
    /// Ports as written. Empty means 80/443 for domains and all ports for CIDRs.
    pub ports: Vec<u16>,
}

impl FirewallEntry {
    pub fn domain(domain: impl Into<String>) -> Self {
        Self {
            target: AllowTarget::Domain(domain.into()),
            ports: Vec::new(),
        }
    }

    pub fn cidr(cidr: impl Into<String>) -> Self {
        Self {
            target: AllowTarget::Cidr(cidr.into()),
            ports: Vec::new(),
        }
    }

    pub fn with_ports(mut self, ports: impl Into<Vec<u16>>) -> Self {
        self.ports = ports.into();
        self
    }

    /// Ports a domain entry opens once resolved.
    pub fn domain_ports(&self) -> Vec<u16> {
        if self.ports.is_empty() {
            DEFAULT_DOMAIN_PORTS.to_vec()
        } else {
            self.ports.clone()
        }
    }
}

/// A command run inside the container after every successful push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncHook {
    #[serde(rename = "cmd")]
    pub command: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Run as root instead of the agent user.
    #[serde(default)]
    pub root: bool,
}

impl SyncHook {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            name: None,
            root: false,
        }
    }

    /// Human-readable label; falls back to the command text.
    pub fn label(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.command,
        }
    }
}

/// On-disk document shape. Every section is optional and may be null.
#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default, deserialize_with = "nullable")]
    sync: Vec<SyncRule>,

    #[serde(default, deserialize_with = "nullable")]
    env: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "nullable")]
    firewall: FirewallDocument,

    #[serde(default, deserialize_with = "nullable")]
    on_sync: Vec<SyncHook>,
}

#[derive(Debug, Default, Deserialize)]
struct FirewallDocument {
    #[serde(default, deserialize_with = "nullable")]
    allow: Vec<RawFirewallEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawFirewallEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    cidr: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    ports: Vec<u16>,
}

impl From<FirewallEntry> for RawFirewallEntry {
    fn from(entry: FirewallEntry) -> Self {
        let (domain, cidr) = match entry.target {
            AllowTarget::Domain(d) => (Some(d), None),
            AllowTarget::Cidr(c) => (None, Some(c)),
        };
        Self {
            domain,
            cidr,
            ports: entry.ports,
        }
    }
}

impl RawFirewallEntry {
    /// Reject entries with both or neither of domain/cidr. Blank strings count as absent.
    fn validate(self, origin: &str) -> Option<FirewallEntry> {
        let domain = self.domain.filter(|d| !d.trim().is_empty());
        let cidr = self.cidr.filter(|c| !c.trim().is_empty());
        let target = match (domain, cidr) {
            (Some(domain), None) => AllowTarget::Domain(domain.trim().to_string()),
            (None, Some(cidr)) => AllowTarget::Cidr(cidr.trim().to_string()),
            (Some(domain), Some(cidr)) => {
                warn!(
                    "{}: firewall entry has both domain ({}) and cidr ({}), skipping",
                    origin, domain, cidr
                );
                return None;
            }
            (None, None) => {
                warn!(
                    "{}: firewall entry has neither domain nor cidr, skipping",
                    origin
                );
                return None;
            }
        };
        Some(FirewallEntry {
            target,
            ports: self.ports,
        })
    }
}

fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept `mode: "0755"` as well as an unquoted `mode: 755` or `mode: 0o755`.
///
/// A number whose decimal digits are all octal is taken as written. Any other
/// number up to `0o7777` is the value of an octal literal. Larger numbers are
/// ignored with a warning and the default mode applies.
fn deserialize_mode<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Mode {
        Text(String),
        Number(u32),
    }

    Ok(match Option::<Mode>::deserialize(deserializer)? {
        Some(Mode::Text(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Mode::Text(_)) | None => None,
        Some(Mode::Number(n)) => numeric_mode(n),
    })
}

fn numeric_mode(n: u32) -> Option<String> {
    let digits = n.to_string();
    if n <= 7777 && digits.bytes().all(|b| b <= b'7') {
        Some(format!("{:0>4}", digits))
    } else if n <= 0o7777 {
        Some(format!("{:04o}", n))
    } else {
        warn!("ignoring invalid file mode {}, quote it as a string", n);
        None
    }
}

/// Parse one document. Malformed YAML yields an empty layer plus a warning.
pub fn parse_config_str(content: &str, origin: &str) -> SandboxConfig {
    if content.trim().is_empty() {
        return SandboxConfig::default();
    }

    let doc: ConfigDocument = match serde_yaml::from_str(content) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("failed to parse {}: {}", origin, e);
            return SandboxConfig::default();
        }
    };

    let allow = doc
        .firewall
        .allow
        .into_iter()
        .filter_map(|raw| raw.validate(origin))
        .collect();

    let on_sync = doc
        .on_sync
        .into_iter()
        .filter(|hook| !hook.command.trim().is_empty())
        .collect();

    SandboxConfig {
        sync: doc.sync,
        env: doc.env,
        firewall: FirewallConfig { allow },
        on_sync,
    }
}

/// Read one document. `None` when the file does not exist.
pub fn parse_config_file(path: &Path) -> Option<SandboxConfig> {
    let origin = path.display().to_string();
    match fs::read_to_string(path) {
        Ok(content) => Some(parse_config_str(&content, &origin)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no config at {}", origin);
            None
        }
        Err(e) => {
            warn!("failed to read {}: {}", origin, e);
            Some(SandboxConfig::default())
        }
    }
}

/// Load and merge the global and workspace documents.
///
/// Errors only when neither document exists.
pub fn load(global_path: &Path, workspace_path: &Path) -> Result<SandboxConfig> {
    let global = parse_config_file(global_path);
    let workspace = parse_config_file(workspace_path);

    match (global, workspace) {
        (None, None) => Err(ConfigError::NotFound {
            global: global_path.to_path_buf(),
            workspace: workspace_path.to_path_buf(),
        }),
        (Some(global), None) => Ok(global),
        (None, Some(workspace)) => Ok(workspace),
        (Some(global), Some(workspace)) => Ok(merge_configs(global, workspace)),
    }
}

/// Load the effective configuration for a workspace.
pub fn load_for_workspace(layout: &SandboxLayout, workspace: &Path) -> Result<SandboxConfig> {
    load(&layout.global_config, &layout.workspace_config(workspace))
}

/// Merge `overlay` on top of `base`.
///
/// - env: per-key override
/// - sync: keyed by destination; a later rule replaces an earlier one in place
/// - firewall: concatenation, no dedup
/// - on_sync: concatenation, base hooks run first
pub fn merge_configs(base: SandboxConfig, overlay: SandboxConfig) -> SandboxConfig {
    let mut env = base.env;
    env.extend(overlay.env);

    let mut sync: Vec<SyncRule> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for rule in base.sync.into_iter().chain(overlay.sync) {
        match positions.get(&rule.dest) {
            Some(&idx) => sync[idx] = rule,
            None => {
                positions.insert(rule.dest.clone(), sync.len());
                sync.push(rule);
            }
        }
    }

    let mut allow = base.firewall.allow;
    allow.extend(overlay.firewall.allow);

    let mut on_sync = base.on_sync;
    on_sync.extend(overlay.on_sync);

    SandboxConfig {
        sync,
        env,
        firewall: FirewallConfig { allow },
        on_sync,
    }
}
