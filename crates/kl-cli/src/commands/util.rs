//! Shared utilities for CLI commands.

use anyhow::{Context, Result};
use kl_core::{Clock, HumanLikelihoodAnalysis, ScoringError, SessionTracker, TrackerConfig};
use kl_db::Database;
use kl_llm::Client;

use crate::Config;

const MISSING_API_KEY: &str =
    "missing Gemini API key (set GEMINI_API_KEY, KL_API_KEY or config.toml)";

/// Opens the configured database, ensuring the parent directory exists.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Tracker settings derived from configuration.
pub fn tracker_config(config: &Config) -> TrackerConfig {
    TrackerConfig {
        prompt: config.prompt,
        ..TrackerConfig::default()
    }
}

/// Builds the Gemini client, reporting setup problems as scoring failures.
pub fn llm_client(config: &Config) -> Result<Client, ScoringError> {
    let api_key = config
        .api_key()
        .ok_or_else(|| ScoringError::Scorer(MISSING_API_KEY.to_string()))?;
    Client::new(api_key)
        .map(|client| client.with_model(config.model.clone()))
        .map_err(|err| ScoringError::Scorer(err.to_string()))
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")
}

/// Scores the tracked session.
///
/// A missing key or failed call still yields the fallback analysis; only
/// runtime setup can fail.
pub fn analyze_session<C: Clock>(
    tracker: &mut SessionTracker<C>,
    config: &Config,
) -> Result<HumanLikelihoodAnalysis> {
    let request = tracker.analysis_request();
    let outcome = match llm_client(config) {
        Ok(client) => runtime()?.block_on(request.send(&client)),
        Err(err) => Err(err),
    };
    Ok(tracker.complete_analysis(outcome))
}

/// Looks up a class system prompt, treating any storage problem as "none".
pub fn class_system_prompt(config: &Config, class_name: &str) -> Option<String> {
    let lookup = open_database(config).and_then(|db| {
        db.class_system_prompt(class_name)
            .context("failed to read class prompt")
    });
    match lookup {
        Ok(prompt) => prompt,
        Err(err) => {
            tracing::warn!(
                error = %format!("{err:#}"),
                class = class_name,
                "error fetching class system prompt"
            );
            None
        }
    }
}
