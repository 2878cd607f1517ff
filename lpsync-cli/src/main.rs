//! lpsync: mirror tagged Launchpad bugs into a Jira project.
//!
//! # Usage
//!
//! ```text
//! lpsync init
//! lpsync sync [--dry-run] [--project <KEY>] [--tag <TAG>] [--config <PATH>] [--jira-token <PATH>]
//! lpsync plan [--json] [--project <KEY>] [--tag <TAG>] [--config <PATH>] [--jira-token <PATH>]
//! ```
//!
//! Logging goes to stderr at `info`; `RUST_LOG` overrides it and `--verbose`
//! raises it to `debug`.

mod commands;
mod credentials;
mod http;
mod jira;
mod launchpad;
mod packages;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{init::InitArgs, plan::PlanArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "lpsync",
    version,
    about = "Mirror tagged Launchpad bugs into a Jira project",
    long_about = None,
)]
struct Cli {
    /// Log at debug level.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the default settings file to ~/.lpsync/config.yaml.
    Init(InitArgs),

    /// Run one sync cycle: create, update, reopen and retire Jira issues.
    Sync(SyncArgs),

    /// Show what a sync would do, without writing to Jira.
    Plan(PlanArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Plan(args) => args.run(),
    }
}
