//! Derived session summary and the human-readable report.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::types::{HumanLikelihoodAnalysis, SessionStats};

const MS_PER_MINUTE: i64 = 60_000;
const RULE: &str = "═══════════════════════════════════════════════════════════";

/// Counts and rounded durations sent to the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub total_edits: usize,
    pub chars_inserted: usize,
    pub chars_deleted: usize,
    pub paste_events: usize,
    pub external_paste_events: usize,
    pub focus_events: usize,
    pub active_minutes: i64,
    pub inactive_minutes: i64,
}

impl SessionSummary {
    pub fn from_stats(stats: &SessionStats) -> Self {
        Self {
            total_edits: stats.total_edit_events,
            chars_inserted: stats.chars_inserted,
            chars_deleted: stats.chars_deleted,
            paste_events: stats.paste_events.len(),
            external_paste_events: stats.external_paste_count(),
            focus_events: stats.focus_events.len(),
            active_minutes: round_minutes(stats.active_time_ms),
            inactive_minutes: round_minutes(stats.inactive_time_ms),
        }
    }

    /// The summary as the JSON object embedded in scoring prompts.
    pub fn to_json(&self) -> Value {
        json!({
            "totalEdits": self.total_edits,
            "charsInserted": self.chars_inserted,
            "charsDeleted": self.chars_deleted,
            "pasteEvents": self.paste_events,
            "externalPasteEvents": self.external_paste_events,
            "focusEvents": self.focus_events,
            "activeMinutes": self.active_minutes,
            "inactiveMinutes": self.inactive_minutes,
        })
    }
}

/// Converts milliseconds to whole minutes, rounding halves up.
pub const fn round_minutes(ms: i64) -> i64 {
    (ms + MS_PER_MINUTE / 2).div_euclid(MS_PER_MINUTE)
}

/// Writes the end-of-session report for `stats` scored by `analysis`.
pub fn write_report<W: Write>(
    writer: &mut W,
    stats: &SessionStats,
    analysis: &HumanLikelihoodAnalysis,
) -> io::Result<()> {
    let summary = SessionSummary::from_stats(stats);

    writeln!(writer, "{RULE}")?;
    writeln!(writer, "Keyllama Final Human Likelihood Summary")?;
    writeln!(writer, "{RULE}")?;
    writeln!(writer, "Human Likelihood Score: {}/100", analysis.score)?;
    writeln!(writer, "Reasons:")?;
    for (i, reason) in analysis.reasons.iter().enumerate() {
        writeln!(writer, "  {}. {reason}", i + 1)?;
    }
    writeln!(writer)?;
    writeln!(writer, "Session Metrics:")?;
    writeln!(writer, "  Total Edits: {}", summary.total_edits)?;
    writeln!(writer, "  Characters Inserted: {}", summary.chars_inserted)?;
    writeln!(writer, "  Characters Deleted: {}", summary.chars_deleted)?;
    writeln!(writer, "  Paste Events: {}", summary.paste_events)?;
    writeln!(
        writer,
        "  External Paste Events: {}",
        summary.external_paste_events
    )?;
    writeln!(writer, "  Focus Events: {}", summary.focus_events)?;
    writeln!(writer, "  Active Time: {} minutes", summary.active_minutes)?;
    writeln!(writer, "  Inactive Time: {} minutes", summary.inactive_minutes)?;
    writeln!(writer, "{RULE}")?;
    Ok(())
}
