//! Keyllama CLI library.
//!
//! Replays recorded editor activity through the session tracker and exposes
//! scoring, chat and report storage as subcommands.

mod cli;
pub mod commands;
mod config;
pub mod replay;

pub use cli::{Cli, Commands};
pub use config::Config;
