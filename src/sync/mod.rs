//! Push the effective configuration into a running sandbox container.
//!
//! A sync builds the manifest, skips everything if the stored fingerprint
//! already matches, and otherwise pushes files while the firewall allowlist
//! resolves in the background. The fingerprint is only written once every
//! step, hooks included, has succeeded.

mod status;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{self, ConfigError, SandboxConfig};
use crate::containers::{ContainerRuntimeInterface, DockerError, ExecUser, SandboxContainer};
use crate::firewall::{self, DomainResolver, FirewallRules};
use crate::fingerprint;
use crate::hooks::{self, HookError};
use crate::layout::{SandboxLayout, ROOT_OWNER};
use crate::manifest::{self, AssetProvider, ManifestError, SyncItem};

pub use status::StatusLine;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Container(#[from] DockerError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("Firewall allowlist resolution stopped before finishing")]
    Resolution,
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Stored fingerprint matched; nothing was touched.
    UpToDate,
    Synced,
}

pub struct Syncer<'a, T: ContainerRuntimeInterface, R: DomainResolver> {
    container: &'a SandboxContainer<T>,
    layout: &'a SandboxLayout,
    assets: &'a dyn AssetProvider,
    resolver: Arc<R>,
    status: StatusLine,
}

impl<'a, T: ContainerRuntimeInterface, R: DomainResolver> Syncer<'a, T, R> {
    pub fn new(
        container: &'a SandboxContainer<T>,
        layout: &'a SandboxLayout,
        assets: &'a dyn AssetProvider,
        resolver: Arc<R>,
    ) -> Self {
        Self {
            container,
            layout,
            assets,
            resolver,
            status: StatusLine::hidden(),
        }
    }

    pub fn with_status(mut self, status: StatusLine) -> Self {
        self.status = status;
        self
    }

    /// Load the workspace's effective configuration and sync it.
    pub async fn sync_workspace(&self, workspace: &Path, force: bool) -> Result<SyncOutcome> {
        let config = config::load_for_workspace(self.layout, workspace)?;
        self.sync(&config, force).await
    }

    pub async fn sync(&self, config: &SandboxConfig, force: bool) -> Result<SyncOutcome> {
        let items = manifest::build(config, self.assets, self.layout)?;
        let digest = fingerprint::compute(&items, config);

        if !force && self.stored_fingerprint()?.as_deref() == Some(digest.as_str()) {
            debug!("fingerprint {} matches, skipping sync", digest);
            return Ok(SyncOutcome::UpToDate);
        }

        self.status.announce("Syncing sandbox...");
        let result = self.push_all(config, &items, &digest).await;
        self.status.clear();
        result.map(|_| SyncOutcome::Synced)
    }

    fn stored_fingerprint(&self) -> Result<Option<String>> {
        let stored = self.container.read_file(&self.layout.fingerprint_file)?;
        Ok(stored.map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string()))
    }

    async fn push_all(&self, config: &SandboxConfig, items: &[SyncItem], digest: &str) -> Result<()> {
        let resolution =
            firewall::spawn_resolution(config.firewall.allow.clone(), Arc::clone(&self.resolver));

        let previous = FirewallRules {
            v4: self.read_text(&self.layout.firewall_rules_v4)?,
            v6: self.read_text(&self.layout.firewall_rules_v6)?,
        };

        info!("pushing {} items to {}", items.len(), self.container.name);
        for item in items {
            self.status.update(&format!("syncing {}", item.dest));
            self.push_item(item)?;
        }

        let status = self.status;
        let resolved = resolution
            .finish(|domain| status.update(&format!("resolving {}", domain)))
            .await;

        let Some(resolution) = resolved else {
            return Err(SyncError::Resolution);
        };
        let rules = firewall::render_rules(&resolution);
        self.reconcile_firewall(&previous, &rules)?;

        hooks::run_hooks(
            self.container,
            &self.layout.container_home,
            &config.on_sync,
            |label| self.status.update(&format!("running {}", label)),
        )?;

        self.commit_fingerprint(digest)
    }

    fn read_text(&self, path: &str) -> Result<String> {
        Ok(self
            .container
            .read_file(path)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default())
    }

    fn push_item(&self, item: &SyncItem) -> Result<()> {
        self.container.make_dir(item.parent_dir())?;
        self.container
            .write_file(&item.dest, &item.data, &item.owner, &item.mode)?;
        Ok(())
    }

    /// Write both rule files, then load them only if either changed.
    ///
    /// A failed load leaves the old rules active and is not an error.
    fn reconcile_firewall(&self, previous: &FirewallRules, rules: &FirewallRules) -> Result<()> {
        self.container.write_file(
            &self.layout.firewall_rules_v4,
            rules.v4.as_bytes(),
            ROOT_OWNER,
            "0755",
        )?;
        self.container.write_file(
            &self.layout.firewall_rules_v6,
            rules.v6.as_bytes(),
            ROOT_OWNER,
            "0755",
        )?;

        if previous == rules {
            debug!("firewall rules unchanged");
            return Ok(());
        }

        self.status.update("applying firewall rules");
        let script = self.layout.firewall_script.as_str();
        match self.container.exec_as(ExecUser::Root, "/", &[script]) {
            Ok(output) if output.status.success() => info!("firewall rules applied"),
            Ok(output) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                warn!("failed to apply firewall rules: {}", text.trim());
            }
            Err(e) => warn!("failed to apply firewall rules: {}", e),
        }
        Ok(())
    }

    fn commit_fingerprint(&self, digest: &str) -> Result<()> {
        let cmd = format!("echo {} > {}", digest, self.layout.fingerprint_file);
        let output = self
            .container
            .exec_as(ExecUser::Root, "/", &["sh", "-c", &cmd])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DockerError::CommandFailed(format!(
                "writing {}: {}",
                self.layout.fingerprint_file,
                stderr.trim()
            ))
            .into());
        }
        debug!("committed fingerprint {}", digest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::fake::FakeRuntime;
    use crate::firewall::resolve::tests::FakeResolver;
    use crate::manifest::BundledAssets;

    fn setup() -> (tempfile::TempDir, SandboxLayout) {
        let home = tempfile::TempDir::new().unwrap();
        let layout = SandboxLayout::with_host_home(home.path());
        (home, layout)
    }

    #[tokio::test]
    async fn test_stored_fingerprint_match_skips_sync() {
        let (_home, layout) = setup();
        let config = SandboxConfig::default();
        let items = manifest::build(&config, &BundledAssets, &layout).unwrap();
        let digest = fingerprint::compute(&items, &config);

        let container = SandboxContainer::new("sandbox-test", FakeRuntime::default());
        container
            .runtime()
            .files
            .lock()
            .unwrap()
            .insert(layout.fingerprint_file.clone(), format!("{}\n", digest).into_bytes());

        let resolver = Arc::new(FakeResolver::default());
        let outcome = Syncer::new(&container, &layout, &BundledAssets, Arc::clone(&resolver))
            .sync(&config, false)
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::UpToDate);
        assert!(container.runtime().exec_commands().is_empty());
        assert_eq!(container.runtime().files.lock().unwrap().len(), 1);
        assert!(resolver.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_fingerprint_triggers_sync() {
        let (_home, layout) = setup();
        let container = SandboxContainer::new("sandbox-test", FakeRuntime::default());
        container
            .runtime()
            .files
            .lock()
            .unwrap()
            .insert(layout.fingerprint_file.clone(), b"stale\n".to_vec());

        let outcome = Syncer::new(
            &container,
            &layout,
            &BundledAssets,
            Arc::new(FakeResolver::default()),
        )
        .sync(&SandboxConfig::default(), false)
        .await
        .unwrap();

        assert_eq!(outcome, SyncOutcome::Synced);
        let files = container.runtime().files.lock().unwrap().clone();
        assert!(files.contains_key(&layout.entrypoint_script));
        assert!(files.contains_key(&layout.firewall_rules_v4));
        assert!(files.contains_key(&layout.firewall_rules_v6));
    }

    #[tokio::test]
    async fn test_missing_config_is_fatal() {
        let (home, layout) = setup();
        let container = SandboxContainer::new("sandbox-test", FakeRuntime::default());
        let err = Syncer::new(
            &container,
            &layout,
            &BundledAssets,
            Arc::new(FakeResolver::default()),
        )
        .sync_workspace(home.path(), false)
        .await
        .unwrap_err();

        assert!(matches!(err, SyncError::Config(ConfigError::NotFound { .. })));
        assert!(container.runtime().exec_commands().is_empty());
    }
}
