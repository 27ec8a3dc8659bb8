//! Session telemetry records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of reasons kept on an analysis.
pub const MAX_REASONS: usize = 5;

/// Whether an edit added or removed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    Insert,
    Delete,
}

impl EditKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EditKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(Self::Insert),
            "delete" => Ok(Self::Delete),
            _ => Err(format!("invalid edit kind: {s}")),
        }
    }
}

/// A single insert or delete observed in the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EditKind,
    /// Number of characters inserted or removed.
    pub length: usize,
    /// Time since the previous change, in milliseconds.
    pub delta_ms: i64,
}

/// A large single insertion, treated as a paste.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteEvent {
    pub timestamp: DateTime<Utc>,
    pub length: usize,
    /// Always `true` when raised: the tracker has no clipboard-origin signal.
    pub external: bool,
    /// The window lost focus shortly before the paste.
    pub after_focus_loss: bool,
}

/// A window focus or blur transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusEvent {
    pub timestamp: DateTime<Utc>,
    pub focused: bool,
}

/// Aggregate statistics for one editing session.
///
/// Owned by a single tracker; callers only ever see clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub start_time: DateTime<Utc>,
    pub last_event_time: DateTime<Utc>,
    pub active_time_ms: i64,
    pub inactive_time_ms: i64,

    /// Raw changes recorded. A change that both deletes and inserts counts once.
    pub total_edit_events: usize,
    pub chars_inserted: usize,
    pub chars_deleted: usize,

    pub edit_events: Vec<EditEvent>,
    pub paste_events: Vec<PasteEvent>,
    pub focus_events: Vec<FocusEvent>,
}

impl SessionStats {
    /// Creates empty statistics starting at `start`, with one synthesized
    /// focus event describing the window state at that moment.
    pub fn new(start: DateTime<Utc>, focused: bool) -> Self {
        Self {
            start_time: start,
            last_event_time: start,
            active_time_ms: 0,
            inactive_time_ms: 0,
            total_edit_events: 0,
            chars_inserted: 0,
            chars_deleted: 0,
            edit_events: Vec::new(),
            paste_events: Vec::new(),
            focus_events: vec![FocusEvent {
                timestamp: start,
                focused,
            }],
        }
    }

    /// Number of paste events flagged as external.
    pub fn external_paste_count(&self) -> usize {
        self.paste_events.iter().filter(|p| p.external).count()
    }

    /// Milliseconds between session start and the most recent change.
    pub fn elapsed_ms(&self) -> i64 {
        (self.last_event_time - self.start_time).num_milliseconds()
    }

    /// Sum of recorded edit lengths of the given kind.
    pub fn edit_volume(&self, kind: EditKind) -> usize {
        self.edit_events
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.length)
            .sum()
    }
}

/// Score and reasons returned by the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanLikelihoodAnalysis {
    /// 0 (highly suspicious) to 100 (clearly authentic).
    pub score: u8,
    pub reasons: Vec<String>,
}

impl HumanLikelihoodAnalysis {
    /// Builds an analysis, clamping the score and keeping at most
    /// [`MAX_REASONS`] non-blank reasons.
    pub fn new(score: i64, reasons: impl IntoIterator<Item = String>) -> Self {
        let reasons = reasons
            .into_iter()
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty())
            .take(MAX_REASONS)
            .collect();
        Self {
            score: u8::try_from(score.clamp(0, 100)).unwrap_or(50),
            reasons,
        }
    }

    /// Returned when the scorer could not produce an analysis.
    pub fn failed() -> Self {
        Self {
            score: 50,
            reasons: vec!["LLM analysis failed".to_string()],
        }
    }

    /// Shown in reports when no analysis has been requested yet.
    pub fn unavailable() -> Self {
        Self {
            score: 50,
            reasons: vec!["No analysis available".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    fn ts(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0)
            .single()
            .expect("valid test timestamp")
            + Duration::milliseconds(ms)
    }

    #[test]
    fn new_stats_synthesize_initial_focus_event() {
        let stats = SessionStats::new(ts(0), false);
        assert_eq!(
            stats.focus_events,
            vec![FocusEvent {
                timestamp: ts(0),
                focused: false
            }]
        );
        assert_eq!(stats.start_time, stats.last_event_time);
        assert_eq!(stats.elapsed_ms(), 0);
    }

    #[test]
    fn edit_volume_sums_by_kind() {
        let mut stats = SessionStats::new(ts(0), true);
        stats.edit_events = vec![
            EditEvent {
                timestamp: ts(10),
                kind: EditKind::Insert,
                length: 4,
                delta_ms: 10,
            },
            EditEvent {
                timestamp: ts(20),
                kind: EditKind::Delete,
                length: 2,
                delta_ms: 10,
            },
            EditEvent {
                timestamp: ts(30),
                kind: EditKind::Insert,
                length: 6,
                delta_ms: 10,
            },
        ];
        assert_eq!(stats.edit_volume(EditKind::Insert), 10);
        assert_eq!(stats.edit_volume(EditKind::Delete), 2);
    }

    #[test]
    fn edit_kind_parses_and_serializes() {
        assert_eq!("insert".parse::<EditKind>().unwrap(), EditKind::Insert);
        assert_eq!("delete".parse::<EditKind>().unwrap(), EditKind::Delete);
        assert!("paste".parse::<EditKind>().is_err());
        assert_eq!(
            serde_json::to_string(&EditKind::Delete).unwrap(),
            "\"delete\""
        );
    }

    #[test]
    fn analysis_clamps_score_and_limits_reasons() {
        let reasons = (1..=7).map(|i| format!("reason {i}"));
        let analysis = HumanLikelihoodAnalysis::new(140, reasons);
        assert_eq!(analysis.score, 100);
        assert_eq!(analysis.reasons.len(), MAX_REASONS);
        assert_eq!(analysis.reasons[0], "reason 1");

        let analysis = HumanLikelihoodAnalysis::new(-3, vec!["  ".to_string()]);
        assert_eq!(analysis.score, 0);
        assert!(analysis.reasons.is_empty());
    }

    #[test]
    fn fallback_analyses_are_fixed() {
        assert_eq!(HumanLikelihoodAnalysis::failed().score, 50);
        assert_eq!(
            HumanLikelihoodAnalysis::failed().reasons,
            vec!["LLM analysis failed"]
        );
        assert_eq!(
            HumanLikelihoodAnalysis::unavailable().reasons,
            vec!["No analysis available"]
        );
    }
}
