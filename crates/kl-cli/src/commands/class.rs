//! Class command for managing per-class assistant system prompts.

use std::io::Write;

use anyhow::Result;
use clap::Subcommand;
use kl_db::{Database, normalize_class_name};

/// Class subcommands.
#[derive(Debug, Subcommand)]
pub enum ClassAction {
    /// Set the system prompt used when students of a class ask for help.
    Set {
        /// Class code (case-insensitive).
        name: String,
        /// System prompt text.
        prompt: String,
    },
    /// Show the system prompt configured for a class.
    Show {
        /// Class code (case-insensitive).
        name: String,
    },
}

pub fn run<W: Write>(writer: &mut W, db: &Database, action: &ClassAction) -> Result<()> {
    match action {
        ClassAction::Set { name, prompt } => {
            db.set_class_prompt(name, prompt)?;
            tracing::debug!(class = %normalize_class_name(name), "class prompt updated");
            writeln!(writer, "Updated prompt for class {}", normalize_class_name(name))?;
        }
        ClassAction::Show { name } => match db.class_system_prompt(name)? {
            Some(prompt) => writeln!(writer, "{prompt}")?,
            None => writeln!(
                writer,
                "No prompt configured for class {}",
                normalize_class_name(name)
            )?,
        },
    }
    Ok(())
}
