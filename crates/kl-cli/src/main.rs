use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kl_cli::commands::{ask, class, replay, sessions, stats, util};
use kl_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // stdout carries command output; diagnostics go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut out = std::io::stdout().lock();
    match &cli.command {
        Some(Commands::Replay(args)) => replay::run(&mut out, args, &config)?,
        Some(Commands::Stats(args)) => stats::run(&mut out, args, &config)?,
        Some(Commands::Ask(args)) => ask::run(&mut out, args, &config)?,
        Some(Commands::Sessions { json }) => {
            let db = util::open_database(&config)?;
            sessions::run(&mut out, &db, *json)?;
        }
        Some(Commands::Class(action)) => {
            let db = util::open_database(&config)?;
            class::run(&mut out, &db, action)?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
