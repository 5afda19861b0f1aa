//! `sandbox config` subcommands implementation

use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{self, templates};
use crate::layout::SandboxLayout;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a default global config and home overlay (never overwrites)
    Init,

    /// Print the effective configuration for a workspace
    Show {
        /// Workspace directory (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output as JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: ConfigCommands) -> Result<()> {
    let layout = SandboxLayout::from_env()?;
    match command {
        ConfigCommands::Init => {
            for line in init(&layout)? {
                println!("{}", line);
            }
            Ok(())
        }
        ConfigCommands::Show { path, json } => show(&layout, &path, json),
    }
}

fn write_if_missing(path: &Path, content: &str, report: &mut Vec<String>) -> Result<()> {
    if path.exists() {
        report.push(format!("Already exists: {}", path.display()));
        return Ok(());
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    report.push(format!("Created {}", path.display()));
    Ok(())
}

/// Create the global config, home overlay and `home/bin`. Returns one report line per file.
pub fn init(layout: &SandboxLayout) -> Result<Vec<String>> {
    let bin_dir = layout.home_overlay.join("bin");
    fs::create_dir_all(&bin_dir)
        .with_context(|| format!("Failed to create {}", bin_dir.display()))?;
    if let Some(parent) = layout.global_config.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut report = Vec::new();
    write_if_missing(&layout.global_config, templates::DEFAULT_CONFIG_YAML, &mut report)?;
    write_if_missing(
        &layout.home_overlay.join(".zshrc"),
        templates::DEFAULT_ZSHRC,
        &mut report,
    )?;
    Ok(report)
}

fn show(layout: &SandboxLayout, path: &Path, json: bool) -> Result<()> {
    let workspace = super::resolve_workspace(path)?;
    let effective = config::load_for_workspace(layout, &workspace)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&effective)?);
    } else {
        print!("{}", serde_yaml::to_string(&effective)?);
    }
    Ok(())
}
