//! Ask command: relay a chat question with session context.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use kl_core::CHAT_FALLBACK_REPLY;

use crate::Config;
use crate::commands::util::{class_system_prompt, llm_client, runtime, tracker_config};
use crate::replay::{load_log, replay};

#[derive(Debug, Args)]
pub struct AskArgs {
    /// Event log describing the session so far (JSON lines).
    pub log: PathBuf,

    /// The question to ask.
    pub message: String,

    /// Start the session with the editor window unfocused.
    #[arg(long)]
    pub unfocused: bool,

    /// Class code whose system prompt frames the conversation.
    #[arg(long)]
    pub class: Option<String>,
}

pub fn run<W: Write>(writer: &mut W, args: &AskArgs, config: &Config) -> Result<()> {
    let entries = load_log(&args.log)?;
    let tracker = replay(&entries, Utc::now(), !args.unfocused, tracker_config(config));
    let system_prompt = args
        .class
        .as_deref()
        .and_then(|class| class_system_prompt(config, class));

    let reply = match llm_client(config) {
        Ok(client) => runtime()?.block_on(tracker.ask(
            &client,
            &args.message,
            system_prompt.as_deref(),
        )),
        Err(err) => {
            tracing::warn!(error = %err, "askAI failed");
            CHAT_FALLBACK_REPLY.to_string()
        }
    };

    writeln!(writer, "{reply}")?;
    Ok(())
}
