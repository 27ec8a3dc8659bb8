//! Replay command: rebuild a session from an event log and report on it.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use kl_core::{HumanLikelihoodAnalysis, PromptTemplate};
use kl_db::SessionRecord;

use crate::Config;
use crate::commands::util::{analyze_session, open_database, tracker_config};
use crate::replay::{load_log, replay};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Event log to replay (JSON lines).
    pub log: PathBuf,

    /// Start the session with the editor window unfocused.
    #[arg(long)]
    pub unfocused: bool,

    /// Score the session with the configured LLM.
    #[arg(long)]
    pub analyze: bool,

    /// Store the session report in the database.
    #[arg(long)]
    pub save: bool,

    /// Student name stored with the report.
    #[arg(long)]
    pub name: Option<String>,

    /// Class code stored with the report.
    #[arg(long)]
    pub class: Option<String>,

    /// Prompt framing: fairness or human-likelihood.
    #[arg(long)]
    pub prompt: Option<PromptTemplate>,
}

pub fn run<W: Write>(writer: &mut W, args: &ReplayArgs, config: &Config) -> Result<()> {
    let entries = load_log(&args.log)?;
    let mut settings = tracker_config(config);
    if let Some(prompt) = args.prompt {
        settings.prompt = prompt;
    }

    let mut tracker = replay(&entries, Utc::now(), !args.unfocused, settings);
    let analysis = if args.analyze {
        Some(analyze_session(&mut tracker, config)?)
    } else {
        None
    };

    let stats = tracker.snapshot();
    tracker.print_summary(writer, Some(&stats), analysis.as_ref())?;

    if args.save {
        let db = open_database(config)?;
        let mut record = SessionRecord::new(
            stats,
            analysis.unwrap_or_else(HumanLikelihoodAnalysis::unavailable),
        );
        record.student_name = args.name.as_deref().map(|name| name.trim().to_lowercase());
        record.class_name.clone_from(&args.class);
        db.insert_session(&record)?;
        writeln!(writer, "Saved session {}", record.id)?;
    }

    Ok(())
}
