//! Stats command: print a replayed session snapshot as JSON.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use crate::Config;
use crate::commands::util::tracker_config;
use crate::replay::{load_log, replay};

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Event log to replay (JSON lines).
    pub log: PathBuf,

    /// Start the session with the editor window unfocused.
    #[arg(long)]
    pub unfocused: bool,

    /// Print the scorer-facing summary instead of the full snapshot.
    #[arg(long)]
    pub summary: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &StatsArgs, config: &Config) -> Result<()> {
    let entries = load_log(&args.log)?;
    let tracker = replay(&entries, Utc::now(), !args.unfocused, tracker_config(config));
    let output = if args.summary {
        serde_json::to_string_pretty(tracker.analysis_request().summary())?
    } else {
        serde_json::to_string_pretty(&tracker.snapshot())?
    };
    writeln!(writer, "{output}")?;
    Ok(())
}
