//! The session telemetry state machine.
//!
//! # Algorithm Summary
//!
//! Each raw change is stamped with the clock and compared against the previous
//! change. Gaps up to the inactivity threshold count as active time. Longer
//! gaps are split: the first `inactivity_threshold_ms` is still credited as
//! active (the user was presumably working up to that point) and the rest is
//! inactive. Inserts at or above the paste threshold also raise a paste event,
//! flagged when the window lost focus shortly before.
//!
//! # Concurrency
//!
//! Ingestion is synchronous and single-threaded. Scoring is the only
//! suspending operation; use [`SessionTracker::analysis_request`] to detach a
//! request, await it elsewhere, and hand the result back with
//! [`SessionTracker::complete_analysis`] so edits keep flowing meanwhile.

use std::io::{self, Write};

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::{CHAT_FALLBACK_REPLY, build_chat_prompt};
use crate::clock::{Clock, SystemClock};
use crate::scoring::{AnalysisRequest, PromptTemplate, Scorer, ScoringError};
use crate::summary::write_report;
use crate::types::{
    EditEvent, EditKind, FocusEvent, HumanLikelihoodAnalysis, PasteEvent, SessionStats,
};

/// Thresholds and scoring options for a tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Gap above which time is split between active and inactive.
    /// Default: 3000 (3 seconds).
    pub inactivity_threshold_ms: i64,

    /// Minimum inserted characters treated as a paste.
    /// Default: 50.
    pub paste_threshold_chars: usize,

    /// How far back a blur counts as "just before" a paste.
    /// Default: 2000 (2 seconds).
    pub focus_lookback_ms: i64,

    /// Prompt framing for scoring requests.
    pub prompt: PromptTemplate,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            inactivity_threshold_ms: 3_000,
            paste_threshold_chars: 50,
            focus_lookback_ms: 2_000,
            prompt: PromptTemplate::default(),
        }
    }
}

/// One content-change notification from the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChange {
    /// Text written by the change (empty for pure deletions).
    #[serde(default)]
    pub inserted_text: String,
    /// Characters removed by the change.
    #[serde(default)]
    pub deleted_length: usize,
}

impl RawChange {
    pub fn insert(text: impl Into<String>) -> Self {
        Self {
            inserted_text: text.into(),
            deleted_length: 0,
        }
    }

    pub const fn delete(length: usize) -> Self {
        Self {
            inserted_text: String::new(),
            deleted_length: length,
        }
    }

    pub fn replace(text: impl Into<String>, deleted_length: usize) -> Self {
        Self {
            inserted_text: text.into(),
            deleted_length,
        }
    }
}

/// Activity classification derived from the most recent gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    Active,
    Inactive,
}

/// Tracks one editing session.
#[derive(Debug)]
pub struct SessionTracker<C = SystemClock> {
    clock: C,
    config: TrackerConfig,
    last_timestamp: DateTime<Utc>,
    state: ActivityState,
    session: SessionStats,
    cached_analysis: Option<HumanLikelihoodAnalysis>,
}

impl<C: Clock> SessionTracker<C> {
    /// Starts a session now, with default thresholds.
    ///
    /// `focused` is the window focus state at construction time.
    pub fn new(clock: C, focused: bool) -> Self {
        Self::with_config(clock, TrackerConfig::default(), focused)
    }

    pub fn with_config(clock: C, config: TrackerConfig, focused: bool) -> Self {
        let now = clock.now().trunc_subsecs(3);
        tracing::debug!(start = %now, focused, "session started");
        Self {
            clock,
            config,
            last_timestamp: now,
            state: ActivityState::Active,
            session: SessionStats::new(now, focused),
            cached_analysis: None,
        }
    }

    /// Clock reading cut to whole milliseconds, so per-gap deltas sum to the
    /// elapsed span.
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(3)
    }

    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub const fn activity_state(&self) -> ActivityState {
        self.state
    }

    /// The most recent successful analysis, if any.
    pub const fn cached_analysis(&self) -> Option<&HumanLikelihoodAnalysis> {
        self.cached_analysis.as_ref()
    }

    /// Records one content change.
    ///
    /// Callers deliver changes in order from a single source; negative or
    /// out-of-order input is not defended against.
    pub fn record_change(&mut self, change: &RawChange) {
        let now = self.now();
        let delta = (now - self.last_timestamp).num_milliseconds();
        let threshold = self.config.inactivity_threshold_ms;

        if delta > threshold {
            if self.state == ActivityState::Active {
                tracing::debug!(gap_ms = delta, "activity state active -> inactive");
            }
            self.state = ActivityState::Inactive;
            self.session.active_time_ms += threshold;
            self.session.inactive_time_ms += delta - threshold;
        } else {
            self.state = ActivityState::Active;
            self.session.active_time_ms += delta;
        }

        self.last_timestamp = now;
        self.session.last_event_time = now;

        let inserted = change.inserted_text.chars().count();
        if inserted > 0 {
            self.session.edit_events.push(EditEvent {
                timestamp: now,
                kind: EditKind::Insert,
                length: inserted,
                delta_ms: delta,
            });
            self.session.chars_inserted += inserted;
            tracing::debug!(length = inserted, delta_ms = delta, "insert");

            if inserted >= self.config.paste_threshold_chars {
                let paste = PasteEvent {
                    timestamp: now,
                    length: inserted,
                    external: true,
                    after_focus_loss: self.was_recent_focus_loss(now),
                };
                tracing::debug!(
                    length = paste.length,
                    after_focus_loss = paste.after_focus_loss,
                    "paste"
                );
                self.session.paste_events.push(paste);
            }
        }

        if change.deleted_length > 0 {
            self.session.edit_events.push(EditEvent {
                timestamp: now,
                kind: EditKind::Delete,
                length: change.deleted_length,
                delta_ms: delta,
            });
            self.session.chars_deleted += change.deleted_length;
            tracing::debug!(length = change.deleted_length, delta_ms = delta, "delete");
        }

        self.session.total_edit_events += 1;
    }

    /// Whether the newest focus event inside the look-back window is a blur.
    ///
    /// Older events are never consulted once an in-window event is found, and
    /// the scan stops at the first event outside the window.
    pub fn was_recent_focus_loss(&self, now: DateTime<Utc>) -> bool {
        self.session
            .focus_events
            .iter()
            .rev()
            .take_while(|event| {
                (now - event.timestamp).num_milliseconds() <= self.config.focus_lookback_ms
            })
            .next()
            .is_some_and(|event| !event.focused)
    }

    /// Records a window focus transition. Repeated states are kept.
    pub fn on_focus_change(&mut self, focused: bool) {
        let now = self.now();
        self.session.focus_events.push(FocusEvent {
            timestamp: now,
            focused,
        });
        tracing::debug!(focused, "focus {}", if focused { "gained" } else { "lost" });
    }

    /// A deep copy of the current statistics.
    pub fn snapshot(&self) -> SessionStats {
        self.session.clone()
    }

    /// Captures a scoring request from the current state.
    pub fn analysis_request(&self) -> AnalysisRequest {
        AnalysisRequest::new(&self.session, self.config.prompt)
    }

    /// Accepts the outcome of a detached request.
    ///
    /// Successful analyses are cached; failures are logged and replaced by
    /// [`HumanLikelihoodAnalysis::failed`].
    pub fn complete_analysis(
        &mut self,
        outcome: Result<HumanLikelihoodAnalysis, ScoringError>,
    ) -> HumanLikelihoodAnalysis {
        match outcome {
            Ok(analysis) => {
                tracing::debug!(score = analysis.score, "analysis cached");
                self.cached_analysis = Some(analysis.clone());
                analysis
            }
            Err(err) => {
                tracing::warn!(error = %err, "LLM analysis failed");
                HumanLikelihoodAnalysis::failed()
            }
        }
    }

    /// Scores the session. Never fails: see [`Self::complete_analysis`].
    pub async fn request_analysis<S: Scorer>(&mut self, scorer: &S) -> HumanLikelihoodAnalysis {
        let request = self.analysis_request();
        let outcome = request.send(scorer).await;
        self.complete_analysis(outcome)
    }

    /// Relays a chat message with the live session counters as context.
    pub async fn ask<S: Scorer>(
        &self,
        scorer: &S,
        message: &str,
        system_prompt: Option<&str>,
    ) -> String {
        let prompt = build_chat_prompt(&self.session, message, system_prompt);
        match scorer.complete(&prompt).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(error = %err, "askAI failed");
                CHAT_FALLBACK_REPLY.to_string()
            }
        }
    }

    /// Writes the summary report for `stats` and `analysis`, defaulting to the
    /// current snapshot and the cached analysis.
    pub fn print_summary<W: Write>(
        &self,
        writer: &mut W,
        stats: Option<&SessionStats>,
        analysis: Option<&HumanLikelihoodAnalysis>,
    ) -> io::Result<()> {
        let stats = stats.unwrap_or(&self.session);
        let fallback;
        let analysis = match analysis.or(self.cached_analysis.as_ref()) {
            Some(analysis) => analysis,
            None => {
                fallback = HumanLikelihoodAnalysis::unavailable();
                &fallback
            }
        };
        write_report(writer, stats, analysis)
    }
}
