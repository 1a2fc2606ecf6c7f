use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gm::commands;

#[derive(Parser)]
#[clap(name = "gm")]
#[clap(about = "Go version manager")]
#[clap(
    long_about = "Go version manager.\nHelps to install and use multiple versions of Go at the same time.\n\nTo install the latest Go toolchain and use it as default run:\n  gm install latest"
)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a Go toolchain and make it current
    #[clap(visible_alias = "i")]
    Install {
        /// Version to install (e.g., 1.22.0, go1.22.0, latest)
        version: String,
    },
    /// Switch the current Go toolchain
    Use {
        /// Installed version to use (or latest)
        version: String,
    },
    /// List installed Go toolchains
    #[clap(visible_alias = "ls")]
    List,
    /// Output shell commands to set environment variables, e.g. eval "$(gm env)"
    Env,
    /// Upgrade gm to the latest version
    #[clap(visible_alias = "up")]
    Upgrade,
    /// Check the environment setup
    Doctor,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> gm::error::Result<()> {
    match command {
        Commands::Install { version } => commands::install::install_version(&version),
        Commands::Use { version } => commands::use_version::use_version(&version),
        Commands::List => commands::list::list_versions(),
        Commands::Env => commands::env::print_env(),
        Commands::Upgrade => commands::upgrade::upgrade_self(),
        Commands::Doctor => commands::doctor::check_environment(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(cli.command).map_err(|e| anyhow::anyhow!(e)) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
