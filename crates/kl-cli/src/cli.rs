//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::ask::AskArgs;
use crate::commands::class::ClassAction;
use crate::commands::replay::ReplayArgs;
use crate::commands::stats::StatsArgs;

/// Editing-session authenticity tracker.
///
/// Replays recorded editor activity, summarizes typing, paste and focus
/// behavior, and asks an LLM how likely the work was written by hand.
#[derive(Debug, Parser)]
#[command(name = "kl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay an editor event log and print the session summary.
    Replay(ReplayArgs),

    /// Replay an event log and print the session snapshot as JSON.
    Stats(StatsArgs),

    /// Replay an event log, then ask the assistant a question about it.
    Ask(AskArgs),

    /// List stored session reports.
    Sessions {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage per-class system prompts.
    #[command(subcommand)]
    Class(ClassAction),
}
