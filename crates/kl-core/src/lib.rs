//! Core domain logic for Keyllama.
//!
//! This crate contains:
//! - Session tracking: ingesting edit and focus notifications into [`SessionStats`]
//! - Summaries: the scorer-facing [`SessionSummary`] and the end-of-session report
//! - Scoring: the [`Scorer`] seam, prompt templates, and reply parsing

pub mod chat;
pub mod clock;
pub mod scoring;
pub mod summary;
pub mod tracker;
pub mod types;

pub use chat::{CHAT_FALLBACK_REPLY, build_chat_prompt};
pub use clock::{Clock, ManualClock, SystemClock};
pub use scoring::{AnalysisRequest, PromptTemplate, Scorer, ScoringError, parse_analysis};
pub use summary::{SessionSummary, round_minutes, write_report};
pub use tracker::{ActivityState, RawChange, SessionTracker, TrackerConfig};
pub use types::{
    EditEvent, EditKind, FocusEvent, HumanLikelihoodAnalysis, MAX_REASONS, PasteEvent,
    SessionStats,
};
