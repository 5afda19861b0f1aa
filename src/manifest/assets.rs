//! Scripts shipped inside the binary and pushed to the container on every sync.

use super::{ItemSource, ManifestError, Result, SyncItem};
use crate::layout::{SandboxLayout, ROOT_OWNER};

pub const ENTRYPOINT_ASSET: &str = "entrypoint.sh";
pub const FIREWALL_ASSET: &str = "init-firewall.sh";

/// Read-only lookup of bundled files by name.
pub trait AssetProvider {
    fn asset(&self, name: &str) -> Option<&[u8]>;
}

/// Assets compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledAssets;

impl AssetProvider for BundledAssets {
    fn asset(&self, name: &str) -> Option<&[u8]> {
        match name {
            ENTRYPOINT_ASSET => Some(&include_bytes!("../../assets/entrypoint.sh")[..]),
            FIREWALL_ASSET => Some(&include_bytes!("../../assets/init-firewall.sh")[..]),
            _ => None,
        }
    }
}

/// Entrypoint and firewall-apply scripts, root-owned and executable.
pub struct BuiltinAssets<'a> {
    provider: &'a dyn AssetProvider,
    layout: &'a SandboxLayout,
}

impl<'a> BuiltinAssets<'a> {
    pub fn new(provider: &'a dyn AssetProvider, layout: &'a SandboxLayout) -> Self {
        Self { provider, layout }
    }
}

impl ItemSource for BuiltinAssets<'_> {
    fn items(&self) -> Result<Vec<SyncItem>> {
        [
            (ENTRYPOINT_ASSET, &self.layout.entrypoint_script),
            (FIREWALL_ASSET, &self.layout.firewall_script),
        ]
        .into_iter()
        .map(|(name, dest)| {
            let data = self
                .provider
                .asset(name)
                .ok_or_else(|| ManifestError::MissingAsset(name.to_string()))?;
            Ok(SyncItem::new(data, dest.as_str(), "0755", ROOT_OWNER))
        })
        .collect()
    }
}
