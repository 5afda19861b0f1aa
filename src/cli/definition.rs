//! Top-level clap definitions for the `sandbox` binary

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use super::config::ConfigCommands;
use super::firewall::FirewallCommands;
use super::sync::SyncArgs;

#[derive(Parser)]
#[command(name = "sandbox")]
#[command(about = "Sync configuration, files and a network allowlist into agent sandboxes")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (same as SANDBOX_DEBUG=1)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Push files, environment, firewall rules and hooks into the workspace sandbox
    Sync(SyncArgs),

    /// Create or inspect sandbox configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Inspect the compiled firewall allowlist
    Firewall {
        #[command(subcommand)]
        command: FirewallCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
