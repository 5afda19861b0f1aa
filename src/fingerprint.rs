//! Content digest that decides whether a sync can be skipped.
//!
//! The digest covers what will end up in the container: every manifest item,
//! the firewall allowlist as written (never the resolved addresses, so the
//! skip check works offline), and the hook definitions.

use sha2::{Digest, Sha256};

use crate::config::{AllowTarget, FirewallEntry, SandboxConfig, SyncHook};
use crate::manifest::SyncItem;

/// Feed a length-prefixed field so adjacent fields can't run into each other.
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Digest of the allowlist text (domain, cidr, ports).
pub fn firewall_digest(entries: &[FirewallEntry]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for entry in entries {
        let (domain, cidr) = match &entry.target {
            AllowTarget::Domain(d) => (d.as_str(), ""),
            AllowTarget::Cidr(c) => ("", c.as_str()),
        };
        update_field(&mut hasher, domain.as_bytes());
        update_field(&mut hasher, cidr.as_bytes());
        let ports = entry
            .ports
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",");
        update_field(&mut hasher, ports.as_bytes());
    }
    hasher.finalize().to_vec()
}

fn update_hook(hasher: &mut Sha256, hook: &SyncHook) {
    update_field(hasher, hook.command.as_bytes());
    update_field(hasher, hook.name.as_deref().unwrap_or("").as_bytes());
    let user: &[u8] = if hook.root { b"root" } else { b"agent" };
    update_field(hasher, user);
}

/// Hex SHA-256 over the manifest, firewall allowlist and hooks.
pub fn compute(items: &[SyncItem], config: &SandboxConfig) -> String {
    let mut hasher = Sha256::new();

    for item in items {
        update_field(&mut hasher, item.dest.as_bytes());
        update_field(&mut hasher, item.mode.as_bytes());
        update_field(&mut hasher, item.owner.as_bytes());
        update_field(&mut hasher, &item.data);
    }

    hasher.update(firewall_digest(&config.firewall.allow));

    for hook in &config.on_sync {
        update_hook(&mut hasher, hook);
    }

    format!("{:x}", hasher.finalize())
}
