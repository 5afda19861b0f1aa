//! `sandbox firewall` subcommands implementation

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;

use crate::config;
use crate::firewall::{self, AddressFamily, SystemResolver};
use crate::layout::SandboxLayout;

#[derive(Subcommand)]
pub enum FirewallCommands {
    /// Resolve the allowlist and print the rules a sync would install
    Show {
        /// Workspace directory (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Print the IPv6 rules instead of IPv4
        #[arg(long)]
        ipv6: bool,
    },
}

pub async fn run(command: FirewallCommands) -> Result<()> {
    match command {
        FirewallCommands::Show { path, ipv6 } => {
            let layout = SandboxLayout::from_env()?;
            let workspace = super::resolve_workspace(&path)?;
            let effective = config::load_for_workspace(&layout, &workspace)?;

            let resolver =
                SystemResolver::from_system_conf().context("Failed to read DNS configuration")?;
            let resolution =
                firewall::resolve_entries(&effective.firewall.allow, &resolver, None).await;

            let family = if ipv6 {
                AddressFamily::Ipv6
            } else {
                AddressFamily::Ipv4
            };
            print!(
                "{}",
                firewall::render(&resolution.domains, &resolution.cidrs, family)
            );
            Ok(())
        }
    }
}
