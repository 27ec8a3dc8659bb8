//! Scoring requests: prompt construction, the scorer seam, and reply parsing.
//!
//! The tracker never talks to a language model directly. It captures a
//! [`SessionSummary`] into an owned [`AnalysisRequest`], which is sent through
//! any [`Scorer`] implementation. Because the request owns its data, the live
//! tracker keeps ingesting edits while a request is in flight.

use std::fmt;
use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::summary::SessionSummary;
use crate::types::{HumanLikelihoodAnalysis, SessionStats};

/// First `{` through last `}`, across newlines.
static JSON_OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

const FAIRNESS_PROMPT: &str = "\
You are an expert at detecting use of AI or external sources in a coding session.
Do NOT assess whether it is human; instead, focus on fair play and originality.

Given the following editor session features, return a JSON object:
- score: 0-100 (100 = completely fair, no external sources or AI used, 0 = highly suspicious)
- reasons: up to 5 bullet points explaining why, strictly flagging any copy-paste or external content

Scoring guidelines:
- External pasting or large paste events should decrease the score.
- Focus loss followed by large insertions is suspicious.
- Rapid or repetitive edits that suggest AI generation should lower the score.
- Normal typing and small edits without external pastes increase the score.";

const HUMAN_LIKELIHOOD_PROMPT: &str = "\
You are an expert at telling human typing apart from generated or pasted text.

Given the following editor session features, return a JSON object:
- score: 0-100 (100 = almost certainly typed by a human, 0 = almost certainly not)
- reasons: up to 5 short bullet points explaining the score

Respond with the JSON object only.";

/// Errors raised while turning a scorer reply into an analysis.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// The scorer call itself failed.
    #[error("scorer call failed: {0}")]
    Scorer(String),
    /// The reply contained no brace-delimited object.
    #[error("no JSON found in scorer reply")]
    MissingJson,
    /// The extracted object did not match the analysis shape.
    #[error("invalid analysis JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A remote text completion used for scoring and chat.
///
/// Implementations bound their own latency; the tracker neither times out
/// nor cancels a call.
pub trait Scorer {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends `prompt` and returns the raw reply text.
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

/// Framing used when asking the scorer for an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptTemplate {
    /// Fair-play / originality framing.
    #[default]
    Fairness,
    /// Plain "was this typed by a human" framing.
    HumanLikelihood,
}

impl PromptTemplate {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fairness => "fairness",
            Self::HumanLikelihood => "human-likelihood",
        }
    }

    const fn preamble(self) -> &'static str {
        match self {
            Self::Fairness => FAIRNESS_PROMPT,
            Self::HumanLikelihood => HUMAN_LIKELIHOOD_PROMPT,
        }
    }

    /// Renders the full prompt for `summary`.
    pub fn render(self, summary: &SessionSummary) -> String {
        format!(
            "{}\n\nFeatures:\n{:#}\n",
            self.preamble(),
            summary.to_json()
        )
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PromptTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fairness" => Ok(Self::Fairness),
            "human-likelihood" => Ok(Self::HumanLikelihood),
            _ => Err(format!("invalid prompt template: {s}")),
        }
    }
}

/// A point-in-time scoring request, detached from the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    summary: SessionSummary,
    prompt: String,
}

impl AnalysisRequest {
    pub fn new(stats: &SessionStats, template: PromptTemplate) -> Self {
        let summary = SessionSummary::from_stats(stats);
        let prompt = template.render(&summary);
        Self { summary, prompt }
    }

    pub const fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Sends the prompt and parses the reply.
    pub async fn send<S: Scorer>(
        &self,
        scorer: &S,
    ) -> Result<HumanLikelihoodAnalysis, ScoringError> {
        let reply = scorer
            .complete(&self.prompt)
            .await
            .map_err(|err| ScoringError::Scorer(err.to_string()))?;
        parse_analysis(&reply)
    }
}

/// Extracts and parses the analysis object embedded in a free-form reply.
pub fn parse_analysis(reply: &str) -> Result<HumanLikelihoodAnalysis, ScoringError> {
    #[derive(Deserialize)]
    struct Payload {
        score: f64,
        #[serde(default)]
        reasons: Vec<String>,
    }

    let object = JSON_OBJECT_RE
        .find(reply)
        .ok_or(ScoringError::MissingJson)?
        .as_str();
    let payload: Payload = serde_json::from_str(object)?;

    #[expect(
        clippy::cast_possible_truncation,
        reason = "score is clamped to 0..=100 by the analysis constructor"
    )]
    let score = payload.score.round() as i64;
    Ok(HumanLikelihoodAnalysis::new(score, payload.reasons))
}
