//! Sessions command for listing stored session reports.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use kl_core::SessionSummary;
use kl_db::{Database, SessionRecord};
use serde::Serialize;

/// One stored report, flattened for display.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEntry {
    pub id: String,
    pub id_short: String,
    pub student_name: Option<String>,
    pub class_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub score: u8,
    pub reasons: Vec<String>,
    pub summary: SessionSummary,
}

impl From<SessionRecord> for SessionEntry {
    fn from(record: SessionRecord) -> Self {
        let id_short: String = record.id.chars().take(8).collect();
        Self {
            summary: SessionSummary::from_stats(&record.stats),
            started_at: record.stats.start_time,
            id: record.id,
            id_short,
            student_name: record.student_name,
            class_name: record.class_name,
            score: record.analysis.score,
            reasons: record.analysis.reasons,
        }
    }
}

/// Format sessions for human-readable output.
pub fn format_sessions(entries: &[SessionEntry]) -> String {
    let mut output = String::new();

    writeln!(output, "SESSIONS").unwrap();
    writeln!(output).unwrap();

    if entries.is_empty() {
        writeln!(output, "No sessions stored.").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "Hint: Run 'kl replay <log> --save' to store a report.").unwrap();
        return output;
    }

    writeln!(
        output,
        "{:<8}  {:<16}  {:<18}  {:<8}  {:>5}  {:>5}  {:>7}",
        "ID", "Started", "Student", "Class", "Score", "Edits", "Active"
    )
    .unwrap();
    writeln!(
        output,
        "────────  ────────────────  ──────────────────  ────────  ─────  ─────  ───────"
    )
    .unwrap();

    for entry in entries {
        let student = entry.student_name.as_deref().unwrap_or("-");
        let student = if student.chars().count() > 18 {
            format!("{}...", student.chars().take(15).collect::<String>())
        } else {
            student.to_string()
        };
        writeln!(
            output,
            "{:<8}  {:<16}  {:<18}  {:<8}  {:>5}  {:>5}  {:>6}m",
            entry.id_short,
            entry.started_at.format("%Y-%m-%d %H:%M"),
            student,
            entry.class_name.as_deref().unwrap_or("-"),
            entry.score,
            entry.summary.total_edits,
            entry.summary.active_minutes,
        )
        .unwrap();
    }

    output
}

/// Runs the sessions command.
pub fn run<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let entries: Vec<SessionEntry> = db
        .list_sessions()?
        .into_iter()
        .map(SessionEntry::from)
        .collect();
    tracing::debug!(count = entries.len(), "listed sessions");

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
    } else {
        write!(writer, "{}", format_sessions(&entries))?;
    }
    Ok(())
}
