//! Agent Sandbox - sync host configuration into agent containers

use agent_sandbox::cli::{self, Cli, Commands};
use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

fn init_tracing(debug: bool) {
    let default = if debug || std::env::var("SANDBOX_DEBUG").is_ok() {
        "agent_sandbox=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Commands::Sync(args) => cli::sync::run(args).await,
        Commands::Config { command } => cli::config::run(command).await,
        Commands::Firewall { command } => cli::firewall::run(command).await,
        Commands::Completion { shell } => {
            generate(shell, &mut Cli::command(), "sandbox", &mut std::io::stdout());
            Ok(())
        }
    }
}
