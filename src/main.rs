//! Giournal CLI - encrypted journaling, git backed
//!
//! Usage:
//!   giournal some words       - add an entry
//!   giournal --editor         - write an entry in your editor
//!   giournal --list           - print all entries
//!   giournal --decrypt        - decrypt entries for editing
//!   giournal --encrypt        - encrypt them again

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::filter::Directive;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("giournal={}", log_level).parse::<Directive>()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    cli::commands::run(cli)
}
