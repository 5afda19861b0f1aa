//! xtask - Development tasks for agent-sandbox

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development tasks for the sandbox CLI")]
struct Xtask {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the `sandbox` command reference as markdown
    GenDocs {
        /// Output file
        #[arg(long, default_value = "docs/sandbox-cli.md")]
        output: PathBuf,
    },
}

fn main() {
    match Xtask::parse().command {
        Commands::GenDocs { output } => write_cli_reference(&output),
    }
}

fn write_cli_reference(output: &Path) {
    let markdown = clap_markdown::help_markdown::<agent_sandbox::cli::Cli>();

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .unwrap_or_else(|e| panic!("Failed to create {}: {}", dir.display(), e));
    }
    fs::write(output, markdown)
        .unwrap_or_else(|e| panic!("Failed to write {}: {}", output.display(), e));

    println!("Wrote sandbox CLI reference to {}", output.display());
}
