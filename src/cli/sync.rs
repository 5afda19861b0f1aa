//! `sandbox sync` command implementation

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use crate::containers::{default_container_runtime, DockerError, SandboxContainer};
use crate::firewall::SystemResolver;
use crate::layout::SandboxLayout;
use crate::manifest::BundledAssets;
use crate::sync::{StatusLine, SyncOutcome, Syncer};

#[derive(Args)]
pub struct SyncArgs {
    /// Workspace directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Sync even if the sandbox is already up to date
    #[arg(short = 'f', long)]
    pub force: bool,
}

pub async fn run(args: SyncArgs) -> Result<()> {
    let workspace = super::resolve_workspace(&args.path)?;
    let layout = SandboxLayout::from_env()?;

    let runtime = default_container_runtime();
    if !runtime.is_docker_available() {
        return Err(DockerError::NotInstalled.into());
    }
    if !runtime.is_daemon_running() {
        return Err(DockerError::DaemonNotRunning.into());
    }

    let container = SandboxContainer::for_workspace(&workspace, runtime);

    if !container.exists()? {
        bail!(
            "No sandbox container {} for {}",
            container.name,
            workspace.display()
        );
    }
    if !container.is_running()? {
        bail!(
            "Sandbox container {} is not running for {}",
            container.name,
            workspace.display()
        );
    }

    let resolver =
        Arc::new(SystemResolver::from_system_conf().context("Failed to read DNS configuration")?);
    let syncer = Syncer::new(&container, &layout, &BundledAssets, resolver)
        .with_status(StatusLine::stderr());

    match syncer.sync_workspace(&workspace, args.force).await? {
        SyncOutcome::UpToDate => println!("Sandbox already up to date"),
        SyncOutcome::Synced => println!("Sync complete"),
    }
    Ok(())
}
