//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use kl_core::PromptTemplate;
use kl_llm::DEFAULT_MODEL;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Gemini API key. Also read from `GEMINI_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Gemini model name.
    pub model: String,
    /// Prompt framing for session scoring.
    pub prompt: PromptTemplate,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("prompt", &self.prompt)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("keyllama.db"),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            prompt: PromptTemplate::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, `GEMINI_API_KEY`, the user config file,
    /// `config_path`, then `KL_*` variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::raw().only(&["GEMINI_API_KEY"]).map(|_| "api_key".into()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (KL_*)
        figment = figment.merge(Env::prefixed("KL_"));

        figment.extract()
    }

    /// The API key, if set to something other than whitespace.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Returns the platform-specific config directory for keyllama.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("keyllama"))
}

/// Returns the platform-specific data directory for keyllama.
///
/// On Linux: `~/.local/share/keyllama`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("keyllama"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_dirs_data_path_ends_with_keyllama() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "keyllama");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("keyllama.db"));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.prompt, PromptTemplate::Fairness);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database_path = \"/tmp/kl-test.db\"\nmodel = \"gemini-pro\"\nprompt = \"human-likelihood\""
        )
        .unwrap();
        file.flush().unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/kl-test.db"));
        assert_eq!(config.model, "gemini-pro");
        assert_eq!(config.prompt, PromptTemplate::HumanLikelihood);
    }

    #[test]
    fn test_blank_api_key_is_treated_as_missing() {
        let config = Config {
            api_key: Some("   ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.api_key(), None);

        let config = Config {
            api_key: Some(" key-123 ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.api_key(), Some("key-123"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config {
            api_key: Some("super-secret".to_string()),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
