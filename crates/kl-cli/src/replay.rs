//! Editor event logs and their replay through a session tracker.
//!
//! A log is JSON lines, one editor notification per line, with offsets in
//! milliseconds from session start:
//!
//! ```text
//! {"offset_ms": 500, "type": "change", "inserted_text": "hello"}
//! {"offset_ms": 4000, "type": "focus", "focused": false}
//! {"offset_ms": 4600, "type": "change", "deleted_length": 10}
//! ```

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use kl_core::{ManualClock, RawChange, SessionTracker, TrackerConfig};
use serde::{Deserialize, Serialize};

/// One line of an event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEntry {
    /// Milliseconds since session start.
    pub offset_ms: i64,
    #[serde(flatten)]
    pub event: ReplayEvent,
}

/// The editor notification carried by a log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
    /// A content change.
    Change {
        #[serde(default)]
        inserted_text: String,
        #[serde(default)]
        deleted_length: usize,
    },
    /// A window focus transition.
    Focus { focused: bool },
}

/// Parses a log, skipping blank lines.
///
/// Offsets must be non-negative and non-decreasing; the tracker assumes a
/// monotonic clock.
pub fn parse_log(input: &str) -> Result<Vec<ReplayEntry>> {
    let mut entries: Vec<ReplayEntry> = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: ReplayEntry = serde_json::from_str(line)
            .with_context(|| format!("invalid event on line {line_no}"))?;
        if entry.offset_ms < 0 {
            bail!("negative offset on line {line_no}: {}", entry.offset_ms);
        }
        if let Some(previous) = entries
            .last()
            .map(|previous| previous.offset_ms)
            .filter(|&previous| entry.offset_ms < previous)
        {
            bail!(
                "out-of-order offset on line {line_no}: {} < {previous}",
                entry.offset_ms
            );
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Reads and parses a log file.
pub fn load_log(path: &Path) -> Result<Vec<ReplayEntry>> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_log(&input).with_context(|| format!("failed to parse {}", path.display()))
}

/// Drives a fresh tracker through `entries`.
///
/// The session starts at `origin` with the given window focus state.
pub fn replay(
    entries: &[ReplayEntry],
    origin: DateTime<Utc>,
    focused: bool,
    config: TrackerConfig,
) -> SessionTracker<ManualClock> {
    let clock = ManualClock::new(origin);
    let mut tracker = SessionTracker::with_config(clock.clone(), config, focused);
    for entry in entries {
        clock.set_offset_ms(entry.offset_ms);
        match &entry.event {
            ReplayEvent::Change {
                inserted_text,
                deleted_length,
            } => tracker.record_change(&RawChange::replace(inserted_text.clone(), *deleted_length)),
            ReplayEvent::Focus { focused } => tracker.on_focus_change(*focused),
        }
    }
    tracing::debug!(events = entries.len(), "replay finished");
    tracker
}

/// The reference session: a short typed word, a blur, a large paste shortly
/// after, then a small deletion.
#[cfg(test)]
pub(crate) fn scenario_log() -> String {
    format!(
        r#"{{"offset_ms": 500, "type": "change", "inserted_text": "hello"}}
{{"offset_ms": 4000, "type": "focus", "focused": false}}
{{"offset_ms": 4500, "type": "change", "inserted_text": "{}"}}
{{"offset_ms": 4600, "type": "change", "deleted_length": 10}}
"#,
        "x".repeat(80)
    )
}
